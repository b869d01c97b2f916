//! Overlay store: the local, backend-confirmed overlay collection.
//!
//! Mutations are two-phase. The merged record is held as a *pending*
//! change while its request is in flight; the confirmed collection only
//! changes once the backend returns the canonical record. A failed request
//! drops the pending change and leaves the collection untouched.
//!
//! Every list load and per-overlay update is stamped with a generation.
//! A response older than the latest request for the same target is
//! discarded instead of overwriting newer state.

use std::collections::HashMap;
use std::sync::Arc;

use overlay_core::error::CoreError;
use overlay_core::gesture::{GestureEvent, GestureOutcome, GestureTracker};
use overlay_core::overlay::{Overlay, OverlayDraft, OverlayPatch, Position, Size};
use overlay_core::types::DbId;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::ClientResult;

/// Interactive confirmation for destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Result of [`OverlayStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The user declined; nothing was sent.
    Cancelled,
}

/// Shared overlay collection synchronized with the backend.
pub struct OverlayStore {
    api: Arc<ApiClient>,
    state: RwLock<StoreState>,
}

impl OverlayStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Confirmed overlays in display order.
    pub async fn list(&self) -> Vec<Overlay> {
        self.state.read().await.overlays.clone()
    }

    /// Confirmed overlay with the given id.
    pub async fn find(&self, id: DbId) -> Option<Overlay> {
        self.state.read().await.find(id).cloned()
    }

    /// Merged record of an in-flight update, if any.
    pub async fn pending(&self, id: DbId) -> Option<Overlay> {
        self.state.read().await.pending.get(&id).cloned()
    }

    /// What to render for `id`: pending over confirmed, with any live
    /// gesture geometry applied on top.
    pub async fn preview(&self, id: DbId) -> Option<Overlay> {
        let state = self.state.read().await;
        let mut overlay = state.pending.get(&id).or_else(|| state.find(id)).cloned()?;
        if let Some(tracker) = state.gestures.get(&id) {
            if let Some(position) = tracker.preview_position() {
                overlay.position_x = position.x;
                overlay.position_y = position.y;
            }
            if let Some(size) = tracker.preview_size() {
                overlay.width = size.width;
                overlay.height = size.height;
            }
        }
        Some(overlay)
    }

    /// Fetch every overlay from the backend.
    ///
    /// Failures are logged and leave the previous collection in place.
    pub async fn load(&self) {
        let generation = self.state.write().await.next_generation();

        match self.api.list_overlays().await {
            Ok(fetched) => {
                let count = fetched.len();
                let mut state = self.state.write().await;
                if state.apply_list(fetched, generation) {
                    tracing::info!(count, "Overlays loaded");
                } else {
                    tracing::debug!(generation, "Discarding stale overlay list");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Error loading overlays");
            }
        }
    }

    /// Fetch one overlay and refresh its confirmed entry if it is known.
    pub async fn get(&self, id: DbId) -> ClientResult<Overlay> {
        let generation = self.state.write().await.next_generation();
        let fetched = self.api.get_overlay(id).await?;

        let mut state = self.state.write().await;
        if state.is_latest(id, generation) {
            state.replace(fetched.clone());
        }
        Ok(fetched)
    }

    /// Validate and create an overlay, appending the backend's record.
    pub async fn create(&self, draft: OverlayDraft) -> ClientResult<Overlay> {
        draft.check()?;

        let created = self.api.create_overlay(&draft).await?;
        tracing::info!(overlay_id = created.id, kind = %created.overlay_type, "Overlay created");

        let mut state = self.state.write().await;
        let generation = state.next_generation();
        state.touched.insert(created.id, generation);
        if state.find(created.id).is_none() {
            state.overlays.push(created.clone());
        } else {
            state.replace(created.clone());
        }
        Ok(created)
    }

    /// Merge `patch` into the overlay and persist the full record.
    pub async fn update(&self, id: DbId, patch: OverlayPatch) -> ClientResult<Overlay> {
        let (generation, merged) = {
            let mut state = self.state.write().await;
            let merged = state
                .find(id)
                .map(|current| patch.merge(current))
                .ok_or(CoreError::NotFound { entity: "overlay", id })?;
            let generation = state.next_generation();
            state.latest.insert(id, generation);
            state.pending.insert(id, merged.clone());
            (generation, merged)
        };

        let result = self.api.update_overlay(id, &merged).await;

        let mut state = self.state.write().await;
        let latest = state.is_latest(id, generation);
        if latest {
            state.pending.remove(&id);
        }

        match result {
            Ok(canonical) => {
                if latest {
                    state.touched.insert(id, generation);
                    state.replace(canonical.clone());
                    tracing::info!(overlay_id = id, "Overlay updated");
                } else {
                    tracing::debug!(overlay_id = id, generation, "Discarding stale overlay update");
                }
                Ok(canonical)
            }
            Err(e) => {
                tracing::error!(overlay_id = id, error = %e, "Error updating overlay");
                Err(e)
            }
        }
    }

    /// Delete an overlay after the user confirms.
    ///
    /// The local entry is removed only once the backend acknowledges.
    pub async fn remove(&self, id: DbId, confirm: &dyn Confirm) -> ClientResult<RemoveOutcome> {
        if self.find(id).await.is_none() {
            return Err(CoreError::NotFound { entity: "overlay", id }.into());
        }

        if !confirm.confirm("Are you sure you want to delete this overlay?") {
            tracing::debug!(overlay_id = id, "Overlay removal cancelled");
            return Ok(RemoveOutcome::Cancelled);
        }

        if let Err(e) = self.api.delete_overlay(id).await {
            tracing::error!(overlay_id = id, error = %e, "Error deleting overlay");
            return Err(e);
        }

        let mut state = self.state.write().await;
        let generation = state.next_generation();
        state.touched.insert(id, generation);
        state.latest.insert(id, generation);
        state.pending.remove(&id);
        state.gestures.remove(&id);
        state.overlays.retain(|o| o.id != id);
        tracing::info!(overlay_id = id, "Overlay deleted");
        Ok(RemoveOutcome::Removed)
    }

    /// Move an overlay. No-op for an id not in the collection.
    pub async fn reposition(&self, id: DbId, position: Position) -> ClientResult<Option<Overlay>> {
        if self.find(id).await.is_none() {
            return Ok(None);
        }
        self.update(id, OverlayPatch::position(position)).await.map(Some)
    }

    /// Resize an overlay. No-op for an id not in the collection.
    pub async fn resize(&self, id: DbId, size: Size) -> ClientResult<Option<Overlay>> {
        if self.find(id).await.is_none() {
            return Ok(None);
        }
        self.update(id, OverlayPatch::size(size)).await.map(Some)
    }

    /// Feed one drag/resize frame. Only a stop event persists geometry.
    pub async fn apply_gesture(&self, id: DbId, event: GestureEvent) -> ClientResult<Option<Overlay>> {
        let outcome = {
            let mut state = self.state.write().await;
            if state.find(id).is_none() {
                return Ok(None);
            }
            let tracker = state.gestures.entry(id).or_default();
            let outcome = tracker.handle(event);
            if outcome.is_some() {
                state.gestures.remove(&id);
            }
            outcome
        };

        match outcome {
            None => Ok(None),
            Some(GestureOutcome::Moved(position)) => self.reposition(id, position).await,
            Some(GestureOutcome::Resized(size)) => self.resize(id, size).await,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StoreState {
    overlays: Vec<Overlay>,
    /// Merged records awaiting backend confirmation.
    pending: HashMap<DbId, Overlay>,
    /// Generation of the newest request issued per overlay.
    latest: HashMap<DbId, u64>,
    /// Generation of the newest confirmed local change per overlay.
    touched: HashMap<DbId, u64>,
    /// Generation of the newest list load.
    list_generation: u64,
    generation: u64,
    gestures: HashMap<DbId, GestureTracker>,
}

impl StoreState {
    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    fn find(&self, id: DbId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| o.id == id)
    }

    fn replace(&mut self, overlay: Overlay) {
        if let Some(slot) = self.overlays.iter_mut().find(|o| o.id == overlay.id) {
            *slot = overlay;
        }
    }

    /// Whether `generation` is still the newest request for `id`.
    fn is_latest(&self, id: DbId, generation: u64) -> bool {
        self.latest.get(&id).map_or(true, |&g| g <= generation)
    }

    /// Install a fetched list issued at `generation`.
    ///
    /// Returns `false` when a newer load has been issued since. Overlays
    /// changed locally after the list request keep their local version.
    fn apply_list(&mut self, fetched: Vec<Overlay>, generation: u64) -> bool {
        if generation < self.list_generation {
            return false;
        }
        self.list_generation = generation;

        let newer = |id: &DbId| self.touched.get(id).is_some_and(|&g| g > generation);

        let mut next = Vec::with_capacity(fetched.len());
        for remote in &fetched {
            if newer(&remote.id) {
                // Keep the local record; a missing one was deleted locally.
                if let Some(local) = self.find(remote.id) {
                    next.push(local.clone());
                }
            } else {
                next.push(remote.clone());
            }
        }
        for local in &self.overlays {
            if newer(&local.id) && !fetched.iter().any(|r| r.id == local.id) {
                next.push(local.clone());
            }
        }

        self.overlays = next;
        true
    }
}
