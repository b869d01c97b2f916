//! REST API client for the overlay backend.
//!
//! Wraps the backend's JSON endpoints (auth, stream settings, stream
//! conversion control, overlay CRUD) using [`reqwest`]. Every request
//! carries the session's bearer token once one exists, plus an
//! `x-request-id` for log correlation.
//!
//! Any 401 response clears the session through
//! [`SessionContext::expire`] and is returned as
//! [`ClientError::Unauthorized`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use overlay_core::overlay::{Overlay, OverlayDraft};
use overlay_core::stream::{hls_url, StreamSettings, StreamStatus, UpdateStreamSettings};
use overlay_core::types::DbId;
use overlay_core::user::{AuthResponse, LoginRequest, RegisterRequest, User};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::session::SessionContext;

/// Header used to correlate client and backend logs.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Acknowledgement body returned by delete and stop endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP client for one backend deployment.
pub struct ApiClient {
    client: reqwest::Client,
    api_base: String,
    session: Arc<SessionContext>,
    /// 401 responses seen over the client's lifetime.
    unauthorized: AtomicU64,
}

impl ApiClient {
    /// Build a client from configuration.
    pub fn new(config: &ClientConfig, session: Arc<SessionContext>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config.api_base_url.clone(), session))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_base: String, session: Arc<SessionContext>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            session,
            unauthorized: AtomicU64::new(0),
        }
    }

    /// API base URL without a trailing slash, e.g. `http://host:5000/api`.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Number of 401 responses received so far, with or without a session.
    pub fn unauthorized_count(&self) -> u64 {
        self.unauthorized.load(Ordering::Relaxed)
    }

    // ---- auth ----

    /// Create an account and store the returned session.
    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<User> {
        let builder = self.request(Method::POST, "/auth/register").json(request);
        let auth: AuthResponse = self.send_json(builder).await?;
        self.session.set_auth(&auth.token, &auth.user)?;
        Ok(auth.user)
    }

    /// Log in and store the returned session.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<User> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/login").json(&body);
        let auth: AuthResponse = self.send_json(builder).await?;
        self.session.set_auth(&auth.token, &auth.user)?;
        Ok(auth.user)
    }

    /// Fetch the profile behind the current token.
    pub async fn me(&self) -> ClientResult<User> {
        self.send_json(self.request(Method::GET, "/auth/me")).await
    }

    /// Forget the local session. The backend keeps no logout state.
    pub fn logout(&self) -> ClientResult<bool> {
        self.session.clear_auth()
    }

    // ---- stream ----

    pub async fn get_stream_settings(&self) -> ClientResult<StreamSettings> {
        self.send_json(self.request(Method::GET, "/stream/settings")).await
    }

    pub async fn update_stream_settings(&self, rtsp_url: &str) -> ClientResult<StreamSettings> {
        let body = UpdateStreamSettings {
            rtsp_url: rtsp_url.to_string(),
        };
        self.send_json(self.request(Method::POST, "/stream/settings").json(&body))
            .await
    }

    /// URL of the HLS playlist the backend serves for a settings row.
    ///
    /// No request is made; the player fetches this URL itself.
    pub fn hls_stream_url(&self, stream_id: DbId) -> String {
        hls_url(&self.api_base, stream_id)
    }

    pub async fn stream_status(&self, stream_id: DbId) -> ClientResult<StreamStatus> {
        self.send_json(self.request(Method::GET, &format!("/stream/status/{stream_id}")))
            .await
    }

    pub async fn stop_stream(&self, stream_id: DbId) -> ClientResult<Ack> {
        self.send_json(self.request(Method::POST, &format!("/stream/stop/{stream_id}")))
            .await
    }

    // ---- overlays ----

    pub async fn list_overlays(&self) -> ClientResult<Vec<Overlay>> {
        self.send_json(self.request(Method::GET, "/overlays")).await
    }

    pub async fn get_overlay(&self, id: DbId) -> ClientResult<Overlay> {
        self.send_json(self.request(Method::GET, &format!("/overlays/{id}")))
            .await
    }

    pub async fn create_overlay(&self, draft: &OverlayDraft) -> ClientResult<Overlay> {
        self.send_json(self.request(Method::POST, "/overlays").json(draft))
            .await
    }

    /// Replace an overlay with the full merged record.
    pub async fn update_overlay(&self, id: DbId, overlay: &Overlay) -> ClientResult<Overlay> {
        self.send_json(self.request(Method::PUT, &format!("/overlays/{id}")).json(overlay))
            .await
    }

    pub async fn delete_overlay(&self, id: DbId) -> ClientResult<Ack> {
        self.send_json(self.request(Method::DELETE, &format!("/overlays/{id}")))
            .await
    }

    // ---- private helpers ----

    /// Start a request with the auth and request-id headers attached.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%method, path, request_id = %request_id, "Sending API request");

        let builder = self
            .client
            .request(method, format!("{}{}", self.api_base, path))
            .header(REQUEST_ID_HEADER, request_id);

        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send, check the status, and decode the JSON body.
    async fn send_json<T: serde::de::DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = builder.send().await?;
        let response = self.ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Map non-2xx responses to errors. A 401 expires the session.
    async fn ensure_success(&self, response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(url = %response.url(), "Backend answered 401");
            self.unauthorized.fetch_add(1, Ordering::Relaxed);
            self.session.expire();
            return Err(ClientError::Unauthorized);
        }

        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        tracing::warn!(status = status.as_u16(), url = %url, "Backend rejected request");
        Err(ClientError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
