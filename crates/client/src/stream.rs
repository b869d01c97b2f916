//! Stream settings state and playback resolution.
//!
//! [`StreamController`] owns the configured source URL and the last
//! loaded [`StreamSettings`]. [`StreamController::playback`] re-derives
//! the player URL from both on every call.

use std::sync::Arc;

use overlay_core::error::CoreError;
use overlay_core::stream::{resolve_playback, Playback, StreamSettings, StreamStatus};
use overlay_core::types::DbId;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::ClientResult;

#[derive(Debug, Default)]
struct StreamState {
    source: String,
    settings: Option<StreamSettings>,
    /// Generation of the newest load or update.
    latest: u64,
    generation: u64,
}

impl StreamState {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.latest = self.generation;
        self.generation
    }

    fn install(&mut self, settings: StreamSettings) {
        self.source = settings.rtsp_url.clone();
        self.settings = Some(settings);
    }
}

/// Configured stream source plus the backend settings row behind it.
pub struct StreamController {
    api: Arc<ApiClient>,
    state: RwLock<StreamState>,
}

impl StreamController {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: RwLock::new(StreamState::default()),
        }
    }

    /// Fetch the settings row. Failures are logged and keep prior state.
    pub async fn load(&self) {
        let generation = self.state.write().await.next_generation();

        match self.api.get_stream_settings().await {
            Ok(settings) => {
                let mut state = self.state.write().await;
                if state.latest != generation {
                    tracing::debug!(generation, "Discarding stale stream settings");
                    return;
                }
                tracing::info!(stream_id = ?settings.id, "Stream settings loaded");
                state.install(settings);
            }
            Err(e) => {
                tracing::error!(error = %e, "Error loading stream settings");
            }
        }
    }

    /// Save a new source URL. The response replaces the settings wholesale.
    pub async fn update(&self, rtsp_url: &str) -> ClientResult<StreamSettings> {
        let rtsp_url = rtsp_url.trim();
        if rtsp_url.is_empty() {
            return Err(CoreError::Validation("stream URL must not be empty".into()).into());
        }

        let generation = self.state.write().await.next_generation();
        let settings = self.api.update_stream_settings(rtsp_url).await.map_err(|e| {
            tracing::error!(error = %e, "Error updating stream settings");
            e
        })?;

        let mut state = self.state.write().await;
        if state.latest == generation {
            tracing::info!(stream_id = ?settings.id, "Stream settings updated");
            state.install(settings.clone());
        } else {
            tracing::debug!(generation, "Discarding stale stream settings update");
        }
        Ok(settings)
    }

    /// The configured source URL (empty when none).
    pub async fn source(&self) -> String {
        self.state.read().await.source.clone()
    }

    pub async fn settings(&self) -> Option<StreamSettings> {
        self.state.read().await.settings.clone()
    }

    /// Resolve what the player should load right now.
    pub async fn playback(&self) -> Playback {
        let state = self.state.read().await;
        resolve_playback(self.api.api_base(), &state.source, state.settings.as_ref())
    }

    /// Converter status for the loaded stream.
    pub async fn status(&self) -> ClientResult<StreamStatus> {
        let id = self.stream_id().await?;
        self.api.stream_status(id).await
    }

    /// Stop the backend converter for the loaded stream.
    pub async fn stop(&self) -> ClientResult<()> {
        let id = self.stream_id().await?;
        let ack = self.api.stop_stream(id).await?;
        tracing::info!(stream_id = id, message = ?ack.message, "Stream stopped");
        Ok(())
    }

    async fn stream_id(&self) -> ClientResult<DbId> {
        self.state
            .read()
            .await
            .settings
            .as_ref()
            .and_then(|s| s.id)
            .ok_or_else(|| CoreError::NotLoaded("stream settings").into())
    }
}
