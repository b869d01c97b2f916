//! Plain-text views of panel state.

use std::fmt::Write;

use overlay_core::overlay::{Overlay, OverlayKind};
use overlay_core::stream::{Playback, StreamStatus};

/// Longest content preview shown in the overlay list.
const PREVIEW_CHARS: usize = 48;

/// Converter start time, shown in UTC.
const STARTED_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Overlay list: header with count, then one block per overlay.
pub fn overlay_list(overlays: &[Overlay]) -> String {
    let mut out = format!("Overlays ({})\n", overlays.len());

    if overlays.is_empty() {
        out.push_str("No overlays yet. Run `overlay-panel overlays add` to create one.\n");
        return out;
    }

    for overlay in overlays {
        let _ = writeln!(
            out,
            "  #{:<4} [{}] {}",
            overlay.id,
            overlay.overlay_type.label(),
            preview(overlay)
        );
        let _ = writeln!(out, "        {}", geometry(overlay));
    }
    out
}

/// `Position: (x, y) | Size: w × h`, rounded to whole pixels.
pub fn geometry(overlay: &Overlay) -> String {
    format!(
        "Position: ({}, {}) | Size: {} × {}",
        overlay.position_x.round(),
        overlay.position_y.round(),
        overlay.width.round(),
        overlay.height.round()
    )
}

fn preview(overlay: &Overlay) -> String {
    match overlay.overlay_type {
        OverlayKind::Image => overlay.content.clone(),
        OverlayKind::Text => {
            let single_line = overlay.content.replace(['\n', '\r'], " ");
            if single_line.chars().count() > PREVIEW_CHARS {
                let cut: String = single_line.chars().take(PREVIEW_CHARS - 1).collect();
                format!("{cut}…")
            } else {
                single_line
            }
        }
    }
}

/// Player view for the configured source.
pub fn playback(source: &str, playback: &Playback) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Source: {}",
        if source.is_empty() { "(none)" } else { source }
    );

    match playback {
        Playback::Ready { url } => {
            let _ = writeln!(out, "Playback URL: {url}");
        }
        Playback::Unresolved { message: Some(message) } => {
            let _ = writeln!(out, "{message}");
            out.push_str("Loading stream...\n");
        }
        Playback::Unresolved { message: None } if source.is_empty() => {
            out.push_str("No stream URL configured\n");
            out.push_str("Please configure an RTSP URL with `overlay-panel stream set <URL>`.\n");
            out.push_str("RTSP streams will be automatically converted to HLS format.\n");
        }
        Playback::Unresolved { message: None } => {
            out.push_str("Unsupported stream URL; use rtsp://, http:// or https://\n");
        }
    }
    out
}

/// Converter status line.
pub fn stream_status(status: &StreamStatus) -> String {
    if !status.running {
        return "Stream converter stopped".to_string();
    }
    match status.started() {
        Some(started) => format!(
            "Stream converter running (started {})",
            started.format(STARTED_FORMAT)
        ),
        None => "Stream converter running".to_string(),
    }
}
