use std::path::PathBuf;
use std::time::Duration;

/// Default backend API base, matching the backend's development server.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API base URL, including the `/api` prefix.
    pub api_base_url: String,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Where the session token and user profile are persisted.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                                          |
    /// |------------------------|--------------------------------------------------|
    /// | `API_BASE_URL`         | `http://localhost:5000/api`                      |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                             |
    /// | `SESSION_FILE`         | `<config dir>/livestream-overlay/session.json`   |
    ///
    /// Values that fail to parse fall back to the default with a warning.
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());

        let request_timeout_secs = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "REQUEST_TIMEOUT_SECS is not a valid u64, using default");
                DEFAULT_REQUEST_TIMEOUT_SECS
            }),
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let session_file = std::env::var("SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());

        Self {
            api_base_url,
            request_timeout_secs,
            session_file,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            session_file: default_session_file(),
        }
    }
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("livestream-overlay")
        .join("session.json")
}
