//! Note actions: create, edit, delete, undo, stacking.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio::time::Instant;

use super::BoardStore;
use crate::modules::board::effects::BoardEffect;
use crate::modules::board::leases::LeaseKind;
use crate::modules::board::state::{DeletedNote, Note, NoteId, NotePatch, Rect, RectOverrides, Trash};

/// Who reported a rect change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectOrigin {
    /// The OS, through a note window's poller. Subject to echo-blocking.
    Window,
    /// A board drag session.
    Drag,
    /// Any other board-side edit.
    Board,
}

/// Who asked for a note to come to the front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOrigin {
    Board,
    /// The note window gained OS focus on its own.
    Os,
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl BoardStore {
    /// Create a note and open its window.
    ///
    /// Without overrides the note lands at a random spot in the upper-left
    /// region of the board with the configured default size.
    pub fn create_note(&mut self, overrides: RectOverrides, now: Instant) -> NoteId {
        let mut rng = rand::rng();
        let base = Rect::new(
            200.0 + rng.random::<f64>() * 300.0,
            200.0 + rng.random::<f64>() * 200.0,
            self.settings.default_note_width,
            self.settings.default_note_height,
        );
        let rect = overrides.apply(base);

        let id = NoteId::generate();
        let title = format!("Note {}", self.state.notes.len() + 1);
        let note = Note::new(id.clone(), title, rect, self.state.max_z() + 1);
        tracing::debug!(%id, ?rect, "notes: created");

        self.state.notes.insert(id.clone(), note);
        self.commit();
        self.open_note_window(&id, now);
        id
    }

    /// Replace a note's rect.
    ///
    /// Window-origin updates are dropped while the note is echo-blocked.
    /// Returns whether the rect changed.
    pub fn update_note_rect(
        &mut self,
        id: &NoteId,
        rect: Rect,
        origin: RectOrigin,
        now: Instant,
    ) -> bool {
        if !self.state.notes.contains_key(id) {
            return false;
        }
        if origin == RectOrigin::Window && self.leases.is_held(id, LeaseKind::EchoBlocked, now) {
            tracing::trace!(%id, ?rect, "sync: echo suppressed");
            return false;
        }

        let Some(note) = self.state.notes.get_mut(id) else { return false };
        if note.rect == rect {
            return false;
        }
        note.rect = rect;
        self.commit();
        true
    }

    /// A note window reported a new position.
    pub fn on_window_moved(&mut self, id: &NoteId, rect: Rect, now: Instant) -> bool {
        self.update_note_rect(id, rect, RectOrigin::Window, now)
    }

    /// A note window reported a new size.
    ///
    /// The first report after a committed board resize is the OS settling
    /// the window and is swallowed.
    pub fn on_window_resized(&mut self, id: &NoteId, rect: Rect, now: Instant) -> bool {
        if self.leases.take(id, LeaseKind::ResizeAck, now) {
            tracing::trace!(%id, ?rect, "sync: resize acknowledgement swallowed");
            return false;
        }
        self.update_note_rect(id, rect, RectOrigin::Window, now)
    }

    /// Merge content edited in a note window.
    pub fn update_note_content(
        &mut self,
        id: &NoteId,
        title: Option<String>,
        content: Option<String>,
    ) -> bool {
        let Some(note) = self.state.notes.get_mut(id) else { return false };
        let mut changed = false;
        if let Some(title) = title
            && note.title != title
        {
            note.title = title;
            changed = true;
        }
        if let Some(content) = content
            && note.content != content
        {
            note.content = content;
            changed = true;
        }
        if changed {
            self.commit();
        }
        changed
    }

    /// Apply an inspector edit from the board.
    ///
    /// An open window is re-hydrated when its visible content changed.
    pub fn update_note_window(&mut self, id: &NoteId, patch: NotePatch) -> bool {
        let Some(note) = self.state.notes.get_mut(id) else { return false };
        let before = note.clone();

        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = content;
        }
        if let Some(color) = patch.color {
            note.color = color;
        }
        if let Some(hidden) = patch.hidden {
            note.hidden = hidden.then_some(true);
        }

        if *note == before {
            return false;
        }
        let visible_change = note.title != before.title
            || note.content != before.content
            || note.color != before.color;
        self.commit();
        if visible_change {
            self.rehydrate_if_open(id);
        }
        true
    }

    /// Delete a note and every link touching it.
    ///
    /// The note is kept in a one-slot trash for [`Self::undo_delete`]; a
    /// later delete overwrites the slot.
    pub fn delete_note(&mut self, id: &NoteId) -> bool {
        let Some(was_open) = self.state.notes.get(id).map(|n| n.is_open) else {
            return false;
        };
        self.close_note_window(id);

        let Some(mut note) = self.state.notes.remove(id) else { return false };
        note.is_open = was_open;

        let removed: Vec<_> = self
            .state
            .links
            .values()
            .filter(|l| l.references(id.as_str()))
            .map(|l| l.id.clone())
            .collect();
        for link in &removed {
            self.state.links.remove(link);
        }

        let ui = &mut self.state.ui;
        ui.selected_note_ids.retain(|n| n != id);
        ui.selected_link_ids.retain(|l| !removed.contains(l));
        if ui.focused_note_id.as_ref() == Some(id) {
            ui.focused_note_id = None;
        }
        ui.trash = Some(Trash {
            last_deleted: Some(DeletedNote { note, deleted_at: epoch_millis() }),
        });

        if self.linking.source.as_ref() == Some(id) {
            self.linking.source = None;
        }
        self.phases.remove(id);
        self.leases.release_all(id);
        self.drags.remove(id);

        tracing::debug!(%id, links = removed.len(), "notes: deleted");
        self.commit();
        true
    }

    /// Restore the most recently deleted note.
    ///
    /// Links removed with it are not restored. Does nothing when the trash
    /// is empty or the id has been reused.
    pub fn undo_delete(&mut self, now: Instant) -> Option<NoteId> {
        let id = self
            .state
            .ui
            .trash
            .as_ref()
            .and_then(|t| t.last_deleted.as_ref())
            .map(|d| d.note.id.clone())?;
        if self.state.notes.contains_key(&id) {
            tracing::debug!(%id, "notes: undo skipped, id in use");
            return None;
        }

        let deleted = self.state.ui.trash.take()?.last_deleted?;
        let mut note = deleted.note;
        let reopen = note.is_open;
        note.is_open = false;
        self.state.notes.insert(id.clone(), note);
        tracing::debug!(%id, reopen, "notes: restored");
        self.commit();

        if reopen {
            self.open_note_window(&id, now);
        }
        Some(id)
    }

    /// Raise a note to the top of the stack and focus it.
    ///
    /// Native focus is only requested for board-originated focus; a note the
    /// OS already focused is not focused again.
    pub fn bring_note_to_front(&mut self, id: &NoteId, origin: FocusOrigin) -> bool {
        let max_z = self.state.max_z();
        let focused_before = self.state.ui.focused_note_id.clone();
        let Some(note) = self.state.notes.get_mut(id) else { return false };

        let mut changed = false;
        if note.z < max_z {
            note.z = max_z + 1;
            changed = true;
        }
        let is_open = note.is_open;

        if focused_before.as_ref() != Some(id) {
            self.state.ui.focused_note_id = Some(id.clone());
            changed = true;
        }
        if origin == FocusOrigin::Board && is_open {
            self.outbox.push(BoardEffect::FocusWindow { id: id.clone() });
        }
        if changed {
            self.commit();
        }
        true
    }

    /// A note window lost OS focus. Focus on the board is unaffected.
    pub fn on_note_blurred(&self, id: &NoteId) {
        tracing::trace!(%id, "notes: blurred");
    }
}
