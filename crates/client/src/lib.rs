//! Async client for the livestream overlay backend.
//!
//! Provides the REST API wrapper, the explicit session context, the
//! overlay store and the stream controller used by the control panel.

pub mod api;
pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod stream;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use session::{SessionContext, SessionEvent};
pub use store::{Confirm, OverlayStore, RemoveOutcome};
pub use stream::StreamController;
