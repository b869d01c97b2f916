//! Overlay records, form drafts and typed patches.
//!
//! The backend stores geometry as flat fields (`position_x`, `position_y`,
//! `width`, `height`). [`Position`] and [`Size`] are the typed views used by
//! the store and the gesture tracker.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateUrl};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Smallest width accepted by the form and the resize handle.
pub const MIN_WIDTH: f64 = 50.0;
/// Smallest height accepted by the form and the resize handle.
pub const MIN_HEIGHT: f64 = 30.0;
/// Largest width the resize handle allows.
pub const MAX_WIDTH: f64 = 800.0;
/// Largest height the resize handle allows.
pub const MAX_HEIGHT: f64 = 600.0;

/// Form default width for a new overlay.
pub const DEFAULT_WIDTH: f64 = 100.0;
/// Form default height for a new overlay.
pub const DEFAULT_HEIGHT: f64 = 50.0;

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// What an overlay renders: literal text or an image fetched from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    #[default]
    Text,
    Image,
}

impl OverlayKind {
    /// Human-readable label used in overlay listings.
    pub fn label(self) -> &'static str {
        match self {
            OverlayKind::Text => "Text",
            OverlayKind::Image => "Image",
        }
    }

    /// Wire name (`text` / `image`).
    pub fn as_str(self) -> &'static str {
        match self {
            OverlayKind::Text => "text",
            OverlayKind::Image => "image",
        }
    }
}

impl std::str::FromStr for OverlayKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OverlayKind::Text),
            "image" => Ok(OverlayKind::Image),
            other => Err(CoreError::Validation(format!(
                "unknown overlay type '{other}' (expected 'text' or 'image')"
            ))),
        }
    }
}

impl std::fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Top-left offset of an overlay inside the player, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Rendered box of an overlay, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Clamp into the range the resize handle permits.
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.clamp(MIN_WIDTH, MAX_WIDTH),
            height: self.height.clamp(MIN_HEIGHT, MAX_HEIGHT),
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An overlay as confirmed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: DbId,
    pub overlay_type: OverlayKind,
    pub content: String,
    pub position_x: f64,
    pub position_y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl Overlay {
    pub fn position(&self) -> Position {
        Position {
            x: self.position_x,
            y: self.position_y,
        }
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.width,
            height: self.height,
        }
    }
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Create/edit form payload, sent as the body of `POST /overlays`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct OverlayDraft {
    pub overlay_type: OverlayKind,
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    pub position_x: f64,
    pub position_y: f64,
    #[validate(range(min = 50.0, max = 800.0, message = "width must be between 50 and 800"))]
    pub width: f64,
    #[validate(range(min = 30.0, max = 600.0, message = "height must be between 30 and 600"))]
    pub height: f64,
}

impl Default for OverlayDraft {
    fn default() -> Self {
        Self {
            overlay_type: OverlayKind::Text,
            content: String::new(),
            position_x: 0.0,
            position_y: 0.0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl OverlayDraft {
    /// Pre-fill a draft from an existing overlay (the edit form).
    pub fn from_overlay(overlay: &Overlay) -> Self {
        Self {
            overlay_type: overlay.overlay_type,
            content: overlay.content.clone(),
            position_x: overlay.position_x,
            position_y: overlay.position_y,
            width: overlay.width,
            height: overlay.height,
        }
    }

    /// Run field validation plus the image-URL rule.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        if self.overlay_type == OverlayKind::Image && !self.content.validate_url() {
            return Err(CoreError::Validation(format!(
                "content: image overlays need a valid URL, got '{}'",
                self.content
            )));
        }
        Ok(())
    }
}

/// Field-level patch for an existing overlay.
///
/// Fields left as `None` keep the current record's value. `id` and the
/// timestamps are never patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    pub overlay_type: Option<OverlayKind>,
    pub content: Option<String>,
    pub position: Option<Position>,
    pub size: Option<Size>,
}

impl OverlayPatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overlay_type.is_none()
            && self.content.is_none()
            && self.position.is_none()
            && self.size.is_none()
    }

    /// Produce the full record to send: patch fields win over `current`.
    pub fn merge(&self, current: &Overlay) -> Overlay {
        let position = self.position.unwrap_or_else(|| current.position());
        let size = self.size.unwrap_or_else(|| current.size());

        Overlay {
            id: current.id,
            overlay_type: self.overlay_type.unwrap_or(current.overlay_type),
            content: self
                .content
                .clone()
                .unwrap_or_else(|| current.content.clone()),
            position_x: position.x,
            position_y: position.y,
            width: size.width,
            height: size.height,
            created_at: current.created_at,
            updated_at: current.updated_at,
        }
    }
}

impl From<OverlayDraft> for OverlayPatch {
    /// An edit-form submission replaces every editable field.
    fn from(draft: OverlayDraft) -> Self {
        Self {
            overlay_type: Some(draft.overlay_type),
            content: Some(draft.content),
            position: Some(Position {
                x: draft.position_x,
                y: draft.position_y,
            }),
            size: Some(Size {
                width: draft.width,
                height: draft.height,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Overlay {
        Overlay {
            id: 7,
            overlay_type: OverlayKind::Text,
            content: "LIVE".to_string(),
            position_x: 10.0,
            position_y: 20.0,
            width: 120.0,
            height: 40.0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn deserializes_backend_record() {
        let json = r#"{
            "id": 3,
            "overlay_type": "image",
            "content": "https://example.com/logo.png",
            "position_x": 1.5,
            "position_y": 2.0,
            "width": 100,
            "height": 50,
            "created_at": "2024-05-01T12:30:00.123456",
            "updated_at": null
        }"#;
        let overlay: Overlay = serde_json::from_str(json).unwrap();
        assert_eq!(overlay.id, 3);
        assert_eq!(overlay.overlay_type, OverlayKind::Image);
        assert_eq!(overlay.size(), Size { width: 100.0, height: 50.0 });
        assert!(overlay.created_at.is_some());
        assert!(overlay.updated_at.is_none());
    }

    #[test]
    fn geometry_patch_preserves_content_and_type() {
        let current = sample();
        let merged = OverlayPatch::position(Position { x: 300.0, y: 90.0 }).merge(&current);
        assert_eq!(merged.position(), Position { x: 300.0, y: 90.0 });
        assert_eq!(merged.size(), current.size());
        assert_eq!(merged.content, "LIVE");
        assert_eq!(merged.overlay_type, OverlayKind::Text);
        assert_eq!(merged.id, 7);
    }

    #[test]
    fn patch_fields_take_precedence() {
        let patch = OverlayPatch {
            overlay_type: Some(OverlayKind::Image),
            content: Some("https://example.com/a.png".to_string()),
            position: None,
            size: Some(Size { width: 60.0, height: 35.0 }),
        };
        let merged = patch.merge(&sample());
        assert_eq!(merged.overlay_type, OverlayKind::Image);
        assert_eq!(merged.content, "https://example.com/a.png");
        assert_eq!(merged.position(), Position { x: 10.0, y: 20.0 });
        assert_eq!(merged.width, 60.0);
    }

    #[test]
    fn empty_patch_is_identity() {
        let patch = OverlayPatch::default();
        assert!(patch.is_empty());
        assert_eq!(patch.merge(&sample()), sample());
    }

    #[test]
    fn default_draft_matches_form_defaults() {
        let draft = OverlayDraft::default();
        assert_eq!(draft.overlay_type, OverlayKind::Text);
        assert_eq!(draft.position_x, 0.0);
        assert_eq!(draft.width, 100.0);
        assert_eq!(draft.height, 50.0);
    }

    #[test]
    fn draft_validation_rejects_small_boxes() {
        let draft = OverlayDraft {
            content: "hi".to_string(),
            width: 49.0,
            ..OverlayDraft::default()
        };
        assert!(matches!(draft.check(), Err(CoreError::Validation(_))));

        let draft = OverlayDraft {
            content: "hi".to_string(),
            height: 29.0,
            ..OverlayDraft::default()
        };
        assert!(draft.check().is_err());
    }

    #[test]
    fn draft_validation_rejects_empty_content() {
        assert!(OverlayDraft::default().check().is_err());
    }

    #[test]
    fn image_draft_requires_url() {
        let mut draft = OverlayDraft {
            overlay_type: OverlayKind::Image,
            content: "not a url".to_string(),
            ..OverlayDraft::default()
        };
        assert!(draft.check().is_err());

        draft.content = "https://example.com/logo.png".to_string();
        assert!(draft.check().is_ok());
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Image".parse::<OverlayKind>().unwrap(), OverlayKind::Image);
        assert_eq!(" text ".parse::<OverlayKind>().unwrap(), OverlayKind::Text);
        assert!("video".parse::<OverlayKind>().is_err());
    }

    #[test]
    fn size_clamps_to_handle_limits() {
        let size = Size { width: 10.0, height: 900.0 }.clamped();
        assert_eq!(size, Size { width: 50.0, height: 600.0 });
    }

    #[test]
    fn draft_converts_to_full_patch() {
        let draft = OverlayDraft::from_overlay(&sample());
        let patch = OverlayPatch::from(draft);
        assert_eq!(patch.merge(&sample()), sample());
    }
}
