//! Authenticated-session context.
//!
//! The session is a bearer token plus the user profile, kept in durable
//! key/value storage under [`TOKEN_KEY`] and [`USER_KEY`]. There is no
//! client-side expiry: the backend answers 401 once a token is no longer
//! valid, and [`SessionContext::expire`] is called from the API client at
//! that point.
//!
//! Session changes are broadcast as [`SessionEvent`]s. Call
//! [`SessionContext::subscribe`] to receive them.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use overlay_core::user::User;
use tokio::sync::broadcast;

use crate::error::{ClientError, ClientResult};

/// Storage key holding the bearer token.
pub const TOKEN_KEY: &str = "livestream_token";

/// Storage key holding the JSON-encoded user profile.
pub const USER_KEY: &str = "livestream_user";

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn(User),
    LoggedOut,
    /// The backend rejected the token; the user must log in again.
    Expired,
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// Durable string key/value storage for session data.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> ClientResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ClientResult<()>;
    fn remove(&self, key: &str) -> ClientResult<()>;
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        lock(&self.values)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        lock(&self.values)?.remove(key);
        Ok(())
    }
}

/// JSON file storage: one object mapping keys to string values.
///
/// The file is rewritten through a temporary sibling and renamed into place.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> ClientResult<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, values: &BTreeMap<String, String>) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(values)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> ClientResult<Option<String>> {
        let _guard = lock(&self.guard)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> ClientResult<()> {
        let _guard = lock(&self.guard)?;
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        self.write_all(&values)
    }

    fn remove(&self, key: &str) -> ClientResult<()> {
        let _guard = lock(&self.guard)?;
        let mut values = self.read_all()?;
        if values.remove(key).is_some() {
            self.write_all(&values)?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> ClientResult<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| ClientError::Storage("session storage lock poisoned".into()))
}

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// Explicit session handle shared by the API client and the coordinator.
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    events: broadcast::Sender<SessionEvent>,
    /// Held across the presence check and removal in `remove_both`.
    clearing: Mutex<()>,
}

impl SessionContext {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            events,
            clearing: Mutex::new(()),
        }
    }

    /// A context backed by [`MemorySessionStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    /// A context backed by [`FileSessionStore`] at `path`.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileSessionStore::new(path)))
    }

    /// Subscribe to session lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The stored bearer token, if any. Storage failures read as absent.
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read session token");
            None
        })
    }

    /// The stored user profile. A malformed profile reads as absent.
    pub fn user(&self) -> Option<User> {
        let raw = self.store.get(USER_KEY).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read session user");
            None
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| tracing::warn!(error = %e, "Stored session user is malformed"))
            .ok()
    }

    /// `true` when a token is stored. Validity is only known to the backend.
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// `Authorization` header value for the stored token.
    pub fn auth_header(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {token}"))
    }

    /// Persist a freshly issued token and its user.
    pub fn set_auth(&self, token: &str, user: &User) -> ClientResult<()> {
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(USER_KEY, &serde_json::to_string(user)?)?;
        tracing::info!(user_id = user.id, username = %user.username, "Session stored");
        let _ = self.events.send(SessionEvent::LoggedIn(user.clone()));
        Ok(())
    }

    /// Explicit logout. Returns whether a session was present.
    pub fn clear_auth(&self) -> ClientResult<bool> {
        let had_session = self.remove_both()?;
        if had_session {
            tracing::info!("Session cleared");
            let _ = self.events.send(SessionEvent::LoggedOut);
        }
        Ok(had_session)
    }

    /// Drop the session after the backend answered 401.
    ///
    /// Emits [`SessionEvent::Expired`] only when a session was actually
    /// removed, so a burst of 401s produces a single redirect.
    pub fn expire(&self) -> bool {
        match self.remove_both() {
            Ok(true) => {
                tracing::warn!("Backend rejected session token, session cleared");
                let _ = self.events.send(SessionEvent::Expired);
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::error!(error = %e, "Failed to clear expired session");
                false
            }
        }
    }

    fn remove_both(&self) -> ClientResult<bool> {
        let _clearing = lock(&self.clearing)?;
        let had_token = self.store.get(TOKEN_KEY)?.is_some();
        let had_user = self.store.get(USER_KEY)?.is_some();
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        Ok(had_token || had_user)
    }
}
