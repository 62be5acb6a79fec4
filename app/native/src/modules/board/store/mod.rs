//! The hub's authoritative board store.
//!
//! `BoardStore` is a synchronous reducer. Every action runs to completion,
//! mutates [`BoardState`] and the transient protocol tables it owns (window
//! phases, leases, drag sessions, linking draft), and records the side
//! effects it needs as [`BoardEffect`] values in an outbox. The hub actor
//! drains the outbox after every message.
//!
//! Actions referencing unknown ids are no-ops. Time is passed in explicitly
//! so protocol timing can be exercised deterministically.
//!
//! Actions are grouped by concern:
//! - [`notes`]: create, edit, delete, undo, stacking
//! - [`links`]: link CRUD and the connect-mode linking draft
//! - [`ui`]: mode, selection and view toggles
//! - [`lifecycle`]: the spawn → ready → hydrate handshake
//! - [`sync`]: drag sessions and OS-reported rect changes
//! - [`externals`]: foreign window tiles

mod externals;
mod lifecycle;
mod links;
mod notes;
mod sync;
mod ui;

use std::collections::HashMap;
use std::time::Duration;

use eyeball::Observable;
pub use lifecycle::{OpenOutcome, OpenRequest, WindowPhase};
pub use notes::{FocusOrigin, RectOrigin};
use serde::Serialize;

use super::drag::DragSession;
use super::effects::BoardEffect;
use super::geometry::DEFAULT_SNAP_THRESHOLD;
use super::leases::LeaseTable;
use super::persistence::sample_board;
use super::state::{BoardState, NoteId};
use crate::config::HinotesConfig;

/// Protocol timing and defaults used by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub handshake_timeout: Duration,
    /// Spawn attempts per open request, first attempt included.
    pub max_spawn_attempts: u32,
    pub echo_block: Duration,
    pub resize_ack_grace: Duration,
    pub default_note_width: f64,
    pub default_note_height: f64,
    pub snap_threshold: f64,
}

impl Default for StoreSettings {
    fn default() -> Self { Self::from_config(&HinotesConfig::default()) }
}

impl StoreSettings {
    #[must_use]
    pub fn from_config(config: &HinotesConfig) -> Self {
        let snap_threshold = if config.board.snap_threshold >= 0.0 {
            config.board.snap_threshold
        } else {
            DEFAULT_SNAP_THRESHOLD
        };

        Self {
            handshake_timeout: config.sync.handshake_timeout(),
            max_spawn_attempts: config.sync.max_spawn_attempts(),
            echo_block: config.sync.echo_block(),
            resize_ack_grace: config.sync.resize_ack_grace(),
            default_note_width: config.board.default_note_width,
            default_note_height: config.board.default_note_height,
            snap_threshold,
        }
    }
}

/// Outcome of the most recent layout write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SaveStatus {
    Saved { revision: u64 },
    Failed { revision: u64, error: String },
}

/// Connect-mode draft: the first note clicked, waiting for a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkingDraft {
    pub source: Option<NoteId>,
}

/// The authoritative board store.
pub struct BoardStore {
    state: BoardState,
    settings: StoreSettings,
    /// Handshake state for notes that are opening. Absent means the phase is
    /// derived from `Note::is_open`.
    phases: HashMap<NoteId, WindowPhase>,
    leases: LeaseTable,
    drags: HashMap<NoteId, DragSession>,
    linking: LinkingDraft,
    outbox: Vec<BoardEffect>,
    /// Bumped on every externally visible mutation.
    revision: Observable<u64>,
    last_save: Option<SaveStatus>,
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("notes", &self.state.notes.len())
            .field("links", &self.state.links.len())
            .field("revision", &self.revision())
            .field("phases", &self.phases)
            .finish_non_exhaustive()
    }
}

impl Default for BoardStore {
    fn default() -> Self { Self::new(StoreSettings::default()) }
}

impl BoardStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            state: BoardState::default(),
            settings,
            phases: HashMap::new(),
            leases: LeaseTable::new(),
            drags: HashMap::new(),
            linking: LinkingDraft::default(),
            outbox: Vec::new(),
            revision: Observable::new(0),
            last_save: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub const fn state(&self) -> &BoardState { &self.state }

    #[must_use]
    pub const fn settings(&self) -> &StoreSettings { &self.settings }

    #[must_use]
    pub fn revision(&self) -> u64 { *Observable::get(&self.revision) }

    /// Subscribe to revision changes.
    #[must_use]
    pub fn subscribe_revision(&self) -> eyeball::Subscriber<u64> {
        Observable::subscribe(&self.revision)
    }

    #[must_use]
    pub const fn last_save(&self) -> Option<&SaveStatus> { self.last_save.as_ref() }

    #[must_use]
    pub const fn linking_draft(&self) -> &LinkingDraft { &self.linking }

    #[must_use]
    pub fn drag_session(&self, id: &str) -> Option<&DragSession> { self.drags.get(id) }

    /// Take every effect produced since the last call.
    pub fn take_effects(&mut self) -> Vec<BoardEffect> { std::mem::take(&mut self.outbox) }

    /// Whether effects are waiting to be drained.
    #[must_use]
    pub fn has_effects(&self) -> bool { !self.outbox.is_empty() }

    // ========================================================================
    // Whole-board actions
    // ========================================================================

    /// Replace the board with a loaded document.
    ///
    /// Every transient table is reset. The document is expected to be
    /// normalized already, so no note is marked open.
    pub fn initialize_from_state(&mut self, state: BoardState) {
        tracing::debug!(
            notes = state.notes.len(),
            links = state.links.len(),
            "board: initializing from state"
        );
        self.state = state;
        self.phases.clear();
        self.leases = LeaseTable::new();
        self.drags.clear();
        self.linking = LinkingDraft::default();
        self.bump_revision();
    }

    /// Close every window, seed the sample board, save it immediately, and
    /// reopen all notes.
    pub fn reset_to_sample_layout(&mut self, now: tokio::time::Instant) {
        let open: Vec<NoteId> = self
            .state
            .notes
            .values()
            .filter(|n| n.is_open || self.phases.contains_key(&n.id))
            .map(|n| n.id.clone())
            .collect();
        for id in open {
            self.close_note_window(&id);
        }

        self.initialize_from_state(sample_board());
        self.outbox.push(BoardEffect::PersistNow);
        self.open_all_notes(now);
    }

    /// Request an immediate save of the current board.
    pub fn flush_now(&mut self) { self.outbox.push(BoardEffect::PersistNow); }

    /// Record the outcome of a layout write.
    pub fn record_save(&mut self, status: SaveStatus) { self.last_save = Some(status); }

    /// Drop expired leases.
    pub fn purge_expired_leases(&mut self, now: tokio::time::Instant) -> usize {
        self.leases.purge_expired(now)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn bump_revision(&mut self) {
        let next = self.revision().wrapping_add(1);
        Observable::set(&mut self.revision, next);
    }

    /// Mark a visible mutation: bump the revision and schedule a save.
    fn commit(&mut self) {
        self.bump_revision();
        self.outbox.push(BoardEffect::SchedulePersist);
    }

    fn emit(&mut self, event: crate::modules::bus::BusEvent) {
        self.outbox.push(BoardEffect::Emit(event));
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_initialize_bumps_revision() {
        let store = store_with_notes();
        assert_eq!(store.revision(), 1);
        assert_eq!(store.state().notes.len(), 3);
    }

    #[test]
    fn test_debug_shows_counts_and_revision() {
        let rendered = format!("{:?}", store_with_notes());
        assert!(rendered.contains("notes: 3"));
        assert!(rendered.contains("revision: 1"));
    }

    #[test]
    fn test_flush_now_requests_immediate_persist() {
        let mut store = BoardStore::default();
        store.flush_now();
        assert_eq!(store.take_effects(), vec![BoardEffect::PersistNow]);
        assert!(!store.has_effects());
    }

    #[test]
    fn test_reset_to_sample_layout() {
        let now = tokio::time::Instant::now();
        let mut store = store_with_notes();
        open(&mut store, "a", now);

        store.reset_to_sample_layout(now);
        let effects = store.take_effects();

        assert_eq!(store.state().notes.len(), 6);
        assert_eq!(store.state().links.len(), 7);
        assert!(effects.contains(&BoardEffect::CloseWindow { id: NoteId::new("a") }));
        assert!(effects.contains(&BoardEffect::PersistNow));
        assert_eq!(count(&effects, |e| matches!(e, BoardEffect::SpawnWindow { .. })), 6);
    }

    #[test]
    fn test_settings_follow_config() {
        let mut config = HinotesConfig::default();
        config.sync.handshake_retries = 3;
        config.sync.echo_block_ms = 50;
        let settings = StoreSettings::from_config(&config);
        assert_eq!(settings.max_spawn_attempts, 4);
        assert_eq!(settings.echo_block, Duration::from_millis(50));
    }

    #[test]
    fn test_record_save() {
        let mut store = BoardStore::default();
        assert!(store.last_save().is_none());
        store.record_save(SaveStatus::Failed { revision: 3, error: "disk full".into() });
        assert!(matches!(store.last_save(), Some(SaveStatus::Failed { .. })));
    }
}
