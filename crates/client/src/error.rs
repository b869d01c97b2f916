use overlay_core::error::CoreError;

/// Errors surfaced by the API client, the overlay store and the stream
/// controller.
///
/// The coordinator splits these three ways: transport failures and
/// backend rejections are shown to the user, while [`ClientError::Unauthorized`]
/// has already cleared the session and only needs a redirect to login.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A domain-level error from `overlay_core` (validation, missing entity).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, timeout, decode).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend returned a non-2xx status other than 401.
    #[error("Backend rejected request ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The backend answered 401. The session has been cleared.
    #[error("Unauthorized: session expired or invalid")]
    Unauthorized,

    /// Reading or writing the persisted session failed.
    #[error("Session storage error: {0}")]
    Storage(String),
}

/// Convenience alias for client return values.
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    /// Short message suitable for a user-facing notification.
    ///
    /// Backend rejections carry a JSON body of the form `{"error": "..."}`;
    /// that text is preferred over the raw body.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected { status, body } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                    .unwrap_or_else(|| body.trim().to_string());
                if detail.is_empty() {
                    format!("request failed with status {status}")
                } else {
                    format!("{detail} (status {status})")
                }
            }
            ClientError::Transport(_) => "could not reach the backend".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_prefers_error_field() {
        let err = ClientError::Rejected {
            status: 404,
            body: r#"{"error": "Stream not found"}"#.to_string(),
        };
        assert_eq!(err.user_message(), "Stream not found (status 404)");
    }

    #[test]
    fn rejected_message_falls_back_to_body() {
        let err = ClientError::Rejected {
            status: 500,
            body: "boom\n".to_string(),
        };
        assert_eq!(err.user_message(), "boom (status 500)");

        let err = ClientError::Rejected {
            status: 502,
            body: String::new(),
        };
        assert_eq!(err.user_message(), "request failed with status 502");
    }

    #[test]
    fn validation_message_passes_through() {
        let err = ClientError::from(CoreError::Validation("content must not be empty".into()));
        assert_eq!(err.user_message(), "Validation failed: content must not be empty");
        assert!(!err.is_unauthorized());
    }
}
