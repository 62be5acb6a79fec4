//! Side-effect intents produced by the board store.
//!
//! Store actions never touch the window host, the bus, or the disk. They
//! describe what should happen as [`BoardEffect`] values; the hub actor
//! drains them after every message and hands them to the executor. Results
//! come back into the actor mailbox as ordinary messages.
//!
//! ```text
//!   message ──► BoardStore (reducer) ──► Vec<BoardEffect>
//!                                          │
//!                     ┌────────────────────┼──────────────────┐
//!                     ▼                    ▼                  ▼
//!              EffectExecutor         MessageBus        persist debounce
//!          (host calls, timers)     (hydrate, ...)      (actor deadline)
//!                     │
//!                     └──► result message ──► mailbox
//! ```

use std::time::Duration;

use super::state::{ExternalId, NoteId, Rect};
use super::store::OpenOutcome;
use crate::modules::bus::BusEvent;
use crate::modules::host::SpawnRequest;

/// Effects that need to be applied outside the store.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEffect {
    /// Ask the host to create a note window.
    SpawnWindow {
        request: SpawnRequest,
        /// 1-based attempt number, echoed back with the result.
        attempt: u32,
    },

    /// Start the ready-handshake timer for a spawn attempt.
    ArmHandshakeTimer { id: NoteId, attempt: u32, timeout: Duration },

    /// Bring a note window to the foreground.
    FocusWindow { id: NoteId },

    /// Destroy a note window.
    CloseWindow { id: NoteId },

    /// Move or resize a note window.
    SetWindowRect { id: NoteId, rect: Rect },

    /// Move or resize a foreign OS window.
    MoveExternal { id: ExternalId, native_handle: String, rect: Rect },

    /// Re-enumerate OS windows for external tile reconciliation.
    RefreshExternals,

    /// Publish an event on the bus.
    Emit(BusEvent),

    /// An open request reached its final outcome.
    OpenSettled { id: NoteId, outcome: OpenOutcome },

    /// The layout changed; persist after the debounce period.
    SchedulePersist,

    /// Persist immediately, bypassing the debounce.
    PersistNow,
}

impl BoardEffect {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SpawnWindow { .. } => "SpawnWindow",
            Self::ArmHandshakeTimer { .. } => "ArmHandshakeTimer",
            Self::FocusWindow { .. } => "FocusWindow",
            Self::CloseWindow { .. } => "CloseWindow",
            Self::SetWindowRect { .. } => "SetWindowRect",
            Self::MoveExternal { .. } => "MoveExternal",
            Self::RefreshExternals => "RefreshExternals",
            Self::Emit(_) => "Emit",
            Self::OpenSettled { .. } => "OpenSettled",
            Self::SchedulePersist => "SchedulePersist",
            Self::PersistNow => "PersistNow",
        }
    }
}
