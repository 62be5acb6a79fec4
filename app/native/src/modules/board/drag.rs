//! Board-side drag and resize sessions.
//!
//! A session tracks one gesture on one note:
//!
//! ```text
//!   Idle ──begin──► Dragging ──commit──► Committing ──rect applied──► Idle
//!                      │
//!                      └──cancel──► Idle (origin rect restored)
//! ```
//!
//! While `Committing`, the hub has asked the host to move the native window
//! and is waiting for the acknowledgement. The absence of a session means
//! the note is idle.

use super::geometry::{
    ResizeHandle, resize_from_handle, snap_rect_full, snap_rect_position,
};
use super::state::{NoteId, Rect};

/// The gesture being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOperation {
    Move,
    Resize(ResizeHandle),
}

impl DragOperation {
    #[must_use]
    pub const fn is_resize(self) -> bool { matches!(self, Self::Resize(_)) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Dragging,
    Committing,
}

/// Snapping applied while dragging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapSettings {
    pub enabled: bool,
    pub grid: f64,
    pub threshold: f64,
}

/// An in-progress gesture on a single note.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub id: NoteId,
    pub operation: DragOperation,
    /// Rect at the start of the gesture.
    pub origin: Rect,
    /// Most recent rect computed from the pointer.
    pub current: Rect,
    pub phase: DragPhase,
}

impl DragSession {
    #[must_use]
    pub const fn start(id: NoteId, operation: DragOperation, origin: Rect) -> Self {
        Self { id, operation, origin, current: origin, phase: DragPhase::Dragging }
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool { self.phase == DragPhase::Dragging }

    /// Compute the rect for a pointer delta measured from the gesture start.
    ///
    /// `free` bypasses snapping (e.g. a modifier key held).
    pub fn update(&mut self, dx: f64, dy: f64, snap: SnapSettings, free: bool) -> Rect {
        let snapping = snap.enabled && !free;
        let next = match self.operation {
            DragOperation::Move => {
                let moved = Rect { x: self.origin.x + dx, y: self.origin.y + dy, ..self.origin };
                if snapping { snap_rect_position(moved, snap.grid, snap.threshold) } else { moved }
            }
            DragOperation::Resize(handle) => {
                let resized = resize_from_handle(self.origin, dx, dy, handle);
                if snapping { snap_rect_full(resized, snap.grid) } else { resized }
            }
        };
        self.current = next;
        next
    }

    pub fn begin_commit(&mut self) { self.phase = DragPhase::Committing; }
}
