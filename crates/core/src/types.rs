/// Backend primary keys are integer row ids.
pub type DbId = i64;

/// Backend timestamps are naive UTC (`datetime.isoformat()` without offset).
pub type Timestamp = chrono::NaiveDateTime;
