//! Hub half of position and size synchronization.
//!
//! Board gestures run through a [`DragSession`]. While dragging, every
//! pointer delta updates the note's rect on the board only. Committing pushes
//! the final rect to the native window and arms an echo-block so the OS
//! reports that follow are not mistaken for user moves; a committed resize
//! also arms a resize acknowledgement that swallows one OS resize report.

use std::time::Duration;

use tokio::time::Instant;

use super::{BoardStore, RectOrigin, WindowPhase};
use crate::modules::board::drag::{DragOperation, DragPhase, DragSession};
use crate::modules::board::effects::BoardEffect;
use crate::modules::board::leases::LeaseKind;
use crate::modules::board::state::{NoteId, Rect};
use crate::modules::host::HostError;

impl BoardStore {
    /// Start a move or resize gesture on a note.
    ///
    /// A session already committing for the note is replaced.
    pub fn begin_drag(&mut self, id: &NoteId, operation: DragOperation) -> bool {
        let Some(note) = self.state.notes.get(id) else { return false };
        self.drags.insert(id.clone(), DragSession::start(id.clone(), operation, note.rect));
        true
    }

    /// Apply a pointer delta, measured from the start of the gesture.
    pub fn drag_by(&mut self, id: &NoteId, dx: f64, dy: f64, free: bool, now: Instant) -> Option<Rect> {
        let snap = self.snap_settings();
        let session = self.drags.get_mut(id).filter(|s| s.is_dragging())?;
        let rect = session.update(dx, dy, snap, free);
        self.update_note_rect(id, rect, RectOrigin::Drag, now);
        Some(rect)
    }

    /// Finish the gesture and push the final rect to the window.
    pub fn commit_drag(&mut self, id: &NoteId, now: Instant) -> bool {
        let Some(session) = self.drags.get(id).filter(|s| s.is_dragging()) else {
            return false;
        };
        let operation = session.operation;

        if self.window_phase(id) != WindowPhase::Open {
            self.drags.remove(id);
            return true;
        }
        let Some(rect) = self.state.notes.get(id).map(|n| n.rect) else { return false };

        self.leases.arm(id, LeaseKind::EchoBlocked, self.settings.echo_block, now);
        if operation.is_resize() {
            self.leases.arm(id, LeaseKind::ResizeAck, self.settings.resize_ack_grace, now);
        }
        if let Some(session) = self.drags.get_mut(id) {
            session.begin_commit();
        }
        tracing::debug!(%id, ?rect, ?operation, "sync: committing drag");
        self.outbox.push(BoardEffect::SetWindowRect { id: id.clone(), rect });
        true
    }

    /// The host acknowledged a `SetWindowRect`.
    pub fn on_rect_applied(&mut self, id: &NoteId, result: Result<(), HostError>) {
        if let Err(err) = result {
            tracing::warn!(%id, error = %err, "sync: window rect not applied");
        }
        if self.drags.get(id).is_some_and(|s| s.phase == DragPhase::Committing) {
            self.drags.remove(id);
        }
    }

    /// Abort a gesture, restoring the rect it started from.
    pub fn cancel_drag(&mut self, id: &NoteId, now: Instant) -> bool {
        let Some(session) = self.drags.remove(id) else { return false };
        if session.is_dragging() {
            self.update_note_rect(id, session.origin, RectOrigin::Board, now);
        }
        true
    }

    /// Move a note from the board outside a drag session, e.g. from the
    /// inspector. The window follows when open.
    pub fn set_note_rect_from_board(&mut self, id: &NoteId, rect: Rect, now: Instant) -> bool {
        if !self.update_note_rect(id, rect, RectOrigin::Board, now) {
            return false;
        }
        if self.window_phase(id) == WindowPhase::Open {
            self.leases.arm(id, LeaseKind::EchoBlocked, self.settings.echo_block, now);
            self.outbox.push(BoardEffect::SetWindowRect { id: id.clone(), rect });
        }
        true
    }

    /// Ignore OS-origin rect reports for a note for `duration`.
    pub fn set_echo_block(&mut self, id: &NoteId, duration: Duration, now: Instant) {
        self.leases.arm(id, LeaseKind::EchoBlocked, duration, now);
    }
}
