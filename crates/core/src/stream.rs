//! Stream settings and playback URL resolution.
//!
//! Browsers cannot play RTSP directly. The backend converts an RTSP source
//! to HLS and serves the playlist from a fixed endpoint keyed by the
//! settings row id. Sources that are already web-playable are used as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Path prefix of the backend's RTSP-to-HLS conversion endpoint.
pub const HLS_ENDPOINT: &str = "/stream/hls";

/// Shown while an RTSP source waits for its settings row to load.
pub const SETTINGS_NOT_LOADED: &str = "Stream settings not loaded. Please wait...";

/// Scheme prefixes a video element can play without conversion.
const WEB_SCHEMES: &[&str] = &["http://", "https://"];

/// Scheme prefix that needs backend conversion.
const RTSP_SCHEME: &str = "rtsp://";

/// The single configured stream source.
///
/// `id` is absent when the backend has no settings row yet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamSettings {
    #[serde(default)]
    pub id: Option<DbId>,
    #[serde(default)]
    pub rtsp_url: String,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

/// Request body for `POST /stream/settings`.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStreamSettings {
    pub rtsp_url: String,
}

/// Response of `GET /stream/status/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StreamStatus {
    pub running: bool,
    /// Unix epoch seconds when the converter started.
    #[serde(default)]
    pub started_at: Option<f64>,
}

impl StreamStatus {
    /// Converter start time, or `None` when unknown or out of range.
    pub fn started(&self) -> Option<DateTime<Utc>> {
        let epoch = self.started_at?;
        if !epoch.is_finite() {
            return None;
        }
        let secs = epoch.floor();
        let nanos = ((epoch - secs) * 1e9) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }
}

/// What the player should do with the configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// Hand this URL to the video element.
    Ready { url: String },
    /// Nothing playable yet; `message` explains why when there is a reason.
    Unresolved { message: Option<String> },
}

impl Playback {
    pub fn url(&self) -> Option<&str> {
        match self {
            Playback::Ready { url } => Some(url),
            Playback::Unresolved { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Playback::Ready { .. } => None,
            Playback::Unresolved { message } => message.as_deref(),
        }
    }
}

/// Compose the HLS playlist URL for a settings row.
///
/// ```
/// use overlay_core::stream::hls_url;
///
/// assert_eq!(hls_url("http://localhost:5000/api/", 3), "http://localhost:5000/api/stream/hls/3");
/// ```
pub fn hls_url(api_base: &str, stream_id: DbId) -> String {
    format!("{}{HLS_ENDPOINT}/{stream_id}", api_base.trim_end_matches('/'))
}

/// Decide what to play for `source` given the loaded `settings`.
///
/// Pure: the result depends only on the arguments.
pub fn resolve_playback(api_base: &str, source: &str, settings: Option<&StreamSettings>) -> Playback {
    if source.is_empty() {
        return Playback::Unresolved { message: None };
    }

    if WEB_SCHEMES.iter().any(|scheme| source.starts_with(scheme)) {
        return Playback::Ready {
            url: source.to_string(),
        };
    }

    if source.starts_with(RTSP_SCHEME) {
        return match settings.and_then(|s| s.id) {
            Some(id) => Playback::Ready {
                url: hls_url(api_base, id),
            },
            None => Playback::Unresolved {
                message: Some(SETTINGS_NOT_LOADED.to_string()),
            },
        };
    }

    Playback::Unresolved { message: None }
}
