//! Pointer gesture debouncing for drag and resize handles.
//!
//! Drag and resize handlers fire on every pointer frame. Only the terminal
//! event of a gesture carries geometry worth persisting; everything before
//! it just updates the live preview.

use serde::{Deserialize, Serialize};

use crate::overlay::{Position, Size};

/// A single pointer frame from a drag or resize handle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureEvent {
    DragStart,
    DragMove { x: f64, y: f64 },
    DragStop { x: f64, y: f64 },
    ResizeStart,
    ResizeMove { width: f64, height: f64 },
    ResizeStop { width: f64, height: f64 },
}

/// Geometry to persist once a gesture has finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    Moved(Position),
    Resized(Size),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Phase {
    #[default]
    Idle,
    Dragging,
    Resizing,
}

/// Per-overlay gesture state.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    phase: Phase,
    preview_position: Option<Position>,
    preview_size: Option<Size>,
    frames: u64,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame. Returns the terminal geometry on a stop event and
    /// `None` for every other frame.
    pub fn handle(&mut self, event: GestureEvent) -> Option<GestureOutcome> {
        match event {
            GestureEvent::DragStart => {
                self.begin(Phase::Dragging);
                None
            }
            GestureEvent::DragMove { x, y } => {
                self.frames += 1;
                self.preview_position = Some(Position { x, y });
                None
            }
            GestureEvent::DragStop { x, y } => {
                self.reset();
                Some(GestureOutcome::Moved(Position { x, y }))
            }
            GestureEvent::ResizeStart => {
                self.begin(Phase::Resizing);
                None
            }
            GestureEvent::ResizeMove { width, height } => {
                self.frames += 1;
                self.preview_size = Some(Size { width, height }.clamped());
                None
            }
            GestureEvent::ResizeStop { width, height } => {
                self.reset();
                Some(GestureOutcome::Resized(Size { width, height }.clamped()))
            }
        }
    }

    /// Whether a drag or resize is currently in progress.
    pub fn is_active(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Live position to render while dragging.
    pub fn preview_position(&self) -> Option<Position> {
        self.preview_position
    }

    /// Live size to render while resizing.
    pub fn preview_size(&self) -> Option<Size> {
        self.preview_size
    }

    /// Intermediate frames seen during the current gesture.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn begin(&mut self, phase: Phase) {
        self.phase = phase;
        self.preview_position = None;
        self.preview_size = None;
        self.frames = 0;
    }

    fn reset(&mut self) {
        self.begin(Phase::Idle);
    }
}
