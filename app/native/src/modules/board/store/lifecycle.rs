//! Note window lifecycle.
//!
//! Per note id the window moves through:
//!
//! ```text
//!   Closed ──open──► Spawning ──spawn ok──► AwaitingReady ──ready──► Open
//!     ▲                 │                        │                   │
//!     │            spawn rejected          timeout (retry once)      │
//!     └─────────────────┴────────────────────────┴──────close────────┘
//! ```
//!
//! `ready` is accepted while still `Spawning` because the window may report
//! before the host acknowledges the spawn. Every spawn result and handshake
//! timer carries the attempt number it belongs to; anything from an older
//! attempt is ignored.

use serde::Serialize;
use tokio::time::Instant;

use super::BoardStore;
use crate::modules::board::effects::BoardEffect;
use crate::modules::board::leases::LeaseKind;
use crate::modules::board::state::{Note, NoteId};
use crate::modules::bus::{BusEvent, Hydrate};
use crate::modules::host::{HostError, SpawnRequest};

/// Handshake phase of a note window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum WindowPhase {
    Closed,
    Spawning { attempt: u32 },
    AwaitingReady { attempt: u32 },
    Open,
}

impl WindowPhase {
    /// Whether an open request is in flight.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Spawning { .. } | Self::AwaitingReady { .. })
    }
}

/// Immediate answer to an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenRequest {
    /// A spawn was issued; the outcome settles later.
    Started,
    AlreadyOpen,
    /// Another open for this note is still in flight.
    InFlight,
    NotFound,
}

/// Final outcome of an open request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "error", rename_all = "camelCase")]
pub enum OpenOutcome {
    Opened,
    AlreadyOpen,
    InFlight,
    NotFound,
    /// The host rejected the spawn.
    Failed(String),
    /// The window never reported ready.
    TimedOut,
    /// The window was closed before the handshake finished.
    Cancelled,
}

impl From<OpenRequest> for Option<OpenOutcome> {
    fn from(request: OpenRequest) -> Self {
        match request {
            OpenRequest::Started => None,
            OpenRequest::AlreadyOpen => Some(OpenOutcome::AlreadyOpen),
            OpenRequest::InFlight => Some(OpenOutcome::InFlight),
            OpenRequest::NotFound => Some(OpenOutcome::NotFound),
        }
    }
}

fn hydrate_event(note: &Note) -> BusEvent {
    BusEvent::NoteHydrate(Hydrate {
        id: note.id.clone(),
        title: note.title.clone(),
        content: note.content.clone(),
        color: note.color.clone(),
    })
}

impl BoardStore {
    /// Current handshake phase of a note window.
    #[must_use]
    pub fn window_phase(&self, id: &NoteId) -> WindowPhase {
        if let Some(phase) = self.phases.get(id) {
            return *phase;
        }
        match self.state.notes.get(id) {
            Some(note) if note.is_open => WindowPhase::Open,
            _ => WindowPhase::Closed,
        }
    }

    /// Open the window for a note.
    ///
    /// At most one open is in flight per note; a duplicate returns
    /// [`OpenRequest::InFlight`] without issuing a second spawn.
    pub fn open_note_window(&mut self, id: &NoteId, now: Instant) -> OpenRequest {
        let Some(note) = self.state.notes.get(id) else {
            tracing::debug!(%id, "lifecycle: open for unknown note ignored");
            return OpenRequest::NotFound;
        };
        if note.is_open && !self.phases.contains_key(id) {
            return OpenRequest::AlreadyOpen;
        }
        if !self.leases.acquire(id, LeaseKind::Opening, None, now) {
            tracing::debug!(%id, "lifecycle: open already in flight");
            return OpenRequest::InFlight;
        }

        let request = SpawnRequest::new(id.clone(), note.rect);
        tracing::debug!(%id, label = %request.label, "lifecycle: spawning window");
        self.phases.insert(id.clone(), WindowPhase::Spawning { attempt: 1 });
        self.outbox.push(BoardEffect::SpawnWindow { request, attempt: 1 });
        OpenRequest::Started
    }

    /// Open every closed note, front-most last so it ends up on top.
    ///
    /// Returns the number of spawns issued.
    pub fn open_all_notes(&mut self, now: Instant) -> usize {
        let mut ids: Vec<(u32, NoteId)> =
            self.state.notes.values().map(|n| (n.z, n.id.clone())).collect();
        ids.sort();
        ids.into_iter()
            .filter(|(_, id)| self.open_note_window(id, now) == OpenRequest::Started)
            .count()
    }

    /// Handle the host's answer to a spawn request.
    pub fn on_spawn_resolved(&mut self, id: &NoteId, attempt: u32, result: Result<(), HostError>) {
        match self.phases.get(id) {
            Some(WindowPhase::Spawning { attempt: current }) if *current == attempt => {}
            _ => {
                tracing::trace!(%id, attempt, "lifecycle: stale spawn result ignored");
                return;
            }
        }

        match result {
            Ok(()) => {
                tracing::debug!(%id, attempt, "lifecycle: spawned, awaiting ready");
                self.phases.insert(id.clone(), WindowPhase::AwaitingReady { attempt });
                self.outbox.push(BoardEffect::ArmHandshakeTimer {
                    id: id.clone(),
                    attempt,
                    timeout: self.settings.handshake_timeout,
                });
            }
            Err(err) => {
                tracing::warn!(%id, attempt, error = %err, "lifecycle: spawn rejected");
                self.abandon_open(id, OpenOutcome::Failed(err.to_string()));
            }
        }
    }

    /// A note window signalled it is ready to receive content.
    pub fn on_note_ready(&mut self, id: &NoteId) {
        let Some(note) = self.state.notes.get(id) else {
            tracing::debug!(%id, "lifecycle: ready from unknown note ignored");
            return;
        };
        let event = hydrate_event(note);
        let was_open = note.is_open;

        match self.phases.get(id).copied() {
            Some(phase) if phase.is_pending() => {
                tracing::debug!(%id, ?phase, "lifecycle: ready, hydrating");
                self.phases.remove(id);
                self.leases.release(id, LeaseKind::Opening);
                self.emit(event);
                if let Some(note) = self.state.notes.get_mut(id) {
                    note.is_open = true;
                }
                self.state.ui.focused_note_id = Some(id.clone());
                self.outbox
                    .push(BoardEffect::OpenSettled { id: id.clone(), outcome: OpenOutcome::Opened });
                self.commit();
            }
            _ if was_open => {
                // The window reloaded and lost its content.
                tracing::debug!(%id, "lifecycle: ready from open window, re-hydrating");
                self.emit(event);
            }
            _ => tracing::debug!(%id, "lifecycle: unsolicited ready ignored"),
        }
    }

    /// The handshake timer for `attempt` fired.
    pub fn on_handshake_timeout(&mut self, id: &NoteId, attempt: u32) {
        match self.phases.get(id) {
            Some(WindowPhase::AwaitingReady { attempt: current }) if *current == attempt => {}
            _ => {
                tracing::trace!(%id, attempt, "lifecycle: stale handshake timer ignored");
                return;
            }
        }

        if attempt < self.settings.max_spawn_attempts {
            let Some(note) = self.state.notes.get(id) else {
                self.abandon_open(id, OpenOutcome::NotFound);
                return;
            };
            let next = attempt + 1;
            tracing::warn!(%id, attempt, "lifecycle: no ready signal, retrying spawn");
            let request = SpawnRequest::new(id.clone(), note.rect);
            self.phases.insert(id.clone(), WindowPhase::Spawning { attempt: next });
            self.outbox.push(BoardEffect::SpawnWindow { request, attempt: next });
        } else {
            tracing::warn!(%id, attempt, "lifecycle: handshake abandoned");
            // The window may exist without ever having reported; don't leave it behind.
            self.outbox.push(BoardEffect::CloseWindow { id: id.clone() });
            self.abandon_open(id, OpenOutcome::TimedOut);
        }
    }

    /// Close a note window.
    ///
    /// An open still in flight is cancelled.
    pub fn close_note_window(&mut self, id: &NoteId) {
        if self.phases.get(id).is_some_and(|p| p.is_pending()) {
            tracing::debug!(%id, "lifecycle: cancelling in-flight open");
            self.outbox.push(BoardEffect::CloseWindow { id: id.clone() });
            self.abandon_open(id, OpenOutcome::Cancelled);
            return;
        }

        let Some(note) = self.state.notes.get_mut(id) else { return };
        if !note.is_open {
            return;
        }
        tracing::debug!(%id, "lifecycle: closing window");
        note.is_open = false;
        self.leases.release_all(id);
        self.drags.remove(id);
        self.outbox.push(BoardEffect::CloseWindow { id: id.clone() });
        self.commit();
    }

    /// The OS closed a note window.
    pub fn mark_note_closed_from_os(&mut self, id: &NoteId) {
        if self.phases.get(id).is_some_and(|p| p.is_pending()) {
            tracing::debug!(%id, "lifecycle: window closed during handshake");
            self.abandon_open(id, OpenOutcome::Cancelled);
        }
        self.phases.remove(id);
        self.leases.release_all(id);
        self.drags.remove(id);

        if let Some(note) = self.state.notes.get_mut(id)
            && note.is_open
        {
            note.is_open = false;
            self.commit();
        }
    }

    /// Open a closed note, close an open one.
    ///
    /// Returns the open request when the toggle opened the note.
    pub fn toggle_note_window(&mut self, id: &NoteId, now: Instant) -> Option<OpenRequest> {
        if self.window_phase(id) == WindowPhase::Closed {
            Some(self.open_note_window(id, now))
        } else {
            self.close_note_window(id);
            None
        }
    }

    /// Re-send the hydrate payload for a note.
    pub fn request_hydrate(&mut self, id: &NoteId) {
        if let Some(note) = self.state.notes.get(id) {
            let event = hydrate_event(note);
            self.emit(event);
        }
    }

    /// Emit hydrate for an open note after its content changed on the board.
    pub(super) fn rehydrate_if_open(&mut self, id: &NoteId) {
        if self.window_phase(id) == WindowPhase::Open {
            self.request_hydrate(id);
        }
    }

    fn abandon_open(&mut self, id: &NoteId, outcome: OpenOutcome) {
        self.phases.remove(id);
        self.leases.release(id, LeaseKind::Opening);
        self.outbox.push(BoardEffect::OpenSettled { id: id.clone(), outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn spawns(effects: &[BoardEffect]) -> usize {
        count(effects, |e| matches!(e, BoardEffect::SpawnWindow { .. }))
    }

    fn settled(effects: &[BoardEffect]) -> Vec<OpenOutcome> {
        effects
            .iter()
            .filter_map(|e| match e {
                BoardEffect::OpenSettled { outcome, .. } => Some(outcome.clone()),
                _ => None,
            })
            .collect()
    }

    fn id(s: &str) -> NoteId { NoteId::new(s) }

    #[test]
    fn test_duplicate_open_issues_one_spawn() {
        let now = Instant::now();
        let mut store = store_with_notes();

        assert_eq!(store.open_note_window(&id("a"), now), OpenRequest::Started);
        assert_eq!(store.open_note_window(&id("a"), now), OpenRequest::InFlight);
        assert_eq!(spawns(&store.take_effects()), 1);
        assert_eq!(store.window_phase(&id("a")), WindowPhase::Spawning { attempt: 1 });
    }

    #[test]
    fn test_open_unknown_or_open_note() {
        let now = Instant::now();
        let mut store = store_with_notes();
        assert_eq!(store.open_note_window(&id("zzz"), now), OpenRequest::NotFound);

        open(&mut store, "a", now);
        assert_eq!(store.open_note_window(&id("a"), now), OpenRequest::AlreadyOpen);
        assert!(store.take_effects().is_empty());
    }

    #[test]
    fn test_ready_hydrates_and_opens() {
        let now = Instant::now();
        let mut store = store_with_notes();
        store.open_note_window(&id("b"), now);
        store.on_spawn_resolved(&id("b"), 1, Ok(()));

        let effects = store.take_effects();
        assert!(effects.iter().any(|e| matches!(
            e,
            BoardEffect::ArmHandshakeTimer { attempt: 1, .. }
        )));

        store.on_note_ready(&id("b"));
        let effects = store.take_effects();

        let note = store.state().note("b").unwrap();
        assert!(note.is_open);
        assert_eq!(store.state().ui.focused_note_id, Some(id("b")));
        assert_eq!(store.window_phase(&id("b")), WindowPhase::Open);
        assert!(effects.iter().any(|e| matches!(
            e,
            BoardEffect::Emit(BusEvent::NoteHydrate(Hydrate { id, title, .. }))
                if id.as_str() == "b" && title == "Note b"
        )));
        assert_eq!(settled(&effects), vec![OpenOutcome::Opened]);
        assert!(effects.contains(&BoardEffect::SchedulePersist));
    }

    #[test]
    fn test_ready_accepted_before_spawn_ack() {
        let now = Instant::now();
        let mut store = store_with_notes();
        store.open_note_window(&id("a"), now);
        store.on_note_ready(&id("a"));
        assert_eq!(store.window_phase(&id("a")), WindowPhase::Open);

        // The late acknowledgement is stale and arms nothing.
        store.take_effects();
        store.on_spawn_resolved(&id("a"), 1, Ok(()));
        assert!(store.take_effects().is_empty());
    }

    #[test]
    fn test_spawn_rejection_releases_lease() {
        let now = Instant::now();
        let mut store = store_with_notes();
        store.open_note_window(&id("a"), now);
        store.on_spawn_resolved(&id("a"), 1, Err(HostError::Rejected("no display".into())));

        let effects = store.take_effects();
        assert_eq!(settled(&effects), vec![OpenOutcome::Failed("request rejected: no display".into())]);
        assert_eq!(store.window_phase(&id("a")), WindowPhase::Closed);
        assert_eq!(store.open_note_window(&id("a"), now), OpenRequest::Started);
    }

    #[test]
    fn test_timeout_retries_once_then_abandons() {
        let now = Instant::now();
        let mut store = store_with_notes();
        store.open_note_window(&id("a"), now);
        store.on_spawn_resolved(&id("a"), 1, Ok(()));
        store.on_handshake_timeout(&id("a"), 1);
        store.on_spawn_resolved(&id("a"), 2, Ok(()));
        store.on_handshake_timeout(&id("a"), 2);

        let effects = store.take_effects();
        assert_eq!(spawns(&effects), 2);
        assert_eq!(settled(&effects), vec![OpenOutcome::TimedOut]);
        assert!(effects.contains(&BoardEffect::CloseWindow { id: id("a") }));
        assert!(!store.state().note("a").unwrap().is_open);
        assert_eq!(store.window_phase(&id("a")), WindowPhase::Closed);
    }

    #[test]
    fn test_stale_timer_is_ignored() {
        let now = Instant::now();
        let mut store = store_with_notes();
        store.open_note_window(&id("a"), now);
        store.on_spawn_resolved(&id("a"), 1, Ok(()));
        store.on_handshake_timeout(&id("a"), 1);
        store.take_effects();

        // Timer from attempt 1 firing again while attempt 2 is spawning.
        store.on_handshake_timeout(&id("a"), 1);
        assert!(store.take_effects().is_empty());
        assert_eq!(store.window_phase(&id("a")), WindowPhase::Spawning { attempt: 2 });
    }

    #[test]
    fn test_close_open_note() {
        let now = Instant::now();
        let mut store = store_with_notes();
        open(&mut store, "a", now);

        store.close_note_window(&id("a"));
        let effects = store.take_effects();
        assert!(effects.contains(&BoardEffect::CloseWindow { id: id("a") }));
        assert!(!store.state().note("a").unwrap().is_open);

        // Closing a closed note does nothing.
        store.close_note_window(&id("a"));
        assert!(store.take_effects().is_empty());
    }

    #[test]
    fn test_close_cancels_in_flight_open() {
        let now = Instant::now();
        let mut store = store_with_notes();
        store.open_note_window(&id("a"), now);
        store.take_effects();

        store.close_note_window(&id("a"));
        let effects = store.take_effects();
        assert_eq!(settled(&effects), vec![OpenOutcome::Cancelled]);

        // A ready from the cancelled window is unsolicited now.
        store.on_note_ready(&id("a"));
        assert!(store.take_effects().is_empty());
    }

    #[test]
    fn test_os_close_clears_state_without_close_call() {
        let now = Instant::now();
        let mut store = store_with_notes();
        open(&mut store, "a", now);

        store.mark_note_closed_from_os(&id("a"));
        let effects = store.take_effects();
        assert!(!effects.iter().any(|e| matches!(e, BoardEffect::CloseWindow { .. })));
        assert!(!store.state().note("a").unwrap().is_open);
    }

    #[test]
    fn test_ready_on_open_note_rehydrates() {
        let now = Instant::now();
        let mut store = store_with_notes();
        open(&mut store, "a", now);

        store.on_note_ready(&id("a"));
        let effects = store.take_effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], BoardEffect::Emit(BusEvent::NoteHydrate(_))));
    }

    #[test]
    fn test_toggle_and_open_all() {
        let now = Instant::now();
        let mut store = store_with_notes();
        assert_eq!(store.open_all_notes(now), 3);
        store.take_effects();
        assert_eq!(store.open_all_notes(now), 0);

        let mut store = store_with_notes();
        open(&mut store, "a", now);
        assert_eq!(store.toggle_note_window(&id("a"), now), None);
        assert_eq!(store.window_phase(&id("a")), WindowPhase::Closed);
        assert_eq!(store.toggle_note_window(&id("a"), now), Some(OpenRequest::Started));
    }

    #[test]
    fn test_request_hydrate_for_missing_note_is_noop() {
        let mut store = BoardStore::default();
        store.request_hydrate(&id("nope"));
        assert!(store.take_effects().is_empty());
    }
}
