//! Message types for the hub actor.
//!
//! - `HubMessage` - commands, executor results, and queries sent to the hub
//! - `HubQuery` - requests for board data (with response channel)
//! - `QueryResult` - responses from queries
//!
//! Events emitted by note windows do not go through the mailbox; the hub
//! reads them straight off the bus.

use tokio::sync::oneshot;

use crate::modules::board::drag::{DragOperation, DragSession};
use crate::modules::board::overlay::{Connector, OverlayState};
use crate::modules::board::state::{
    BoardState, ConnectStyle, ExternalId, LinkId, Note, NoteId, NotePatch, Rect, RectOverrides, UiMode,
};
use crate::modules::board::store::{LinkingDraft, OpenOutcome, SaveStatus, WindowPhase};
use crate::modules::host::{ExternalSnapshot, HostError};

// ============================================================================
// Hub Messages
// ============================================================================

/// Messages sent to the hub actor.
#[derive(Debug)]
pub enum HubMessage {
    // ════════════════════════════════════════════════════════════════════════
    // Notes
    // ════════════════════════════════════════════════════════════════════════
    /// Create a note and open its window.
    CreateNote {
        overrides: RectOverrides,
        respond_to: Option<oneshot::Sender<NoteId>>,
    },

    /// Delete a note into the trash slot.
    DeleteNote { id: NoteId },

    /// Restore the last deleted note.
    UndoDelete,

    /// Edit title and/or content from the board.
    UpdateContent {
        id: NoteId,
        title: Option<String>,
        content: Option<String>,
    },

    /// Change window-visible fields (title, color).
    PatchNote { id: NoteId, patch: NotePatch },

    /// Raise a note and focus its window.
    BringToFront { id: NoteId },

    /// Move a note from the board outside a drag gesture.
    SetNoteRect { id: NoteId, rect: Rect },

    // ════════════════════════════════════════════════════════════════════════
    // Window lifecycle
    // ════════════════════════════════════════════════════════════════════════
    /// Open a note window; the responder receives the final outcome.
    OpenNote {
        id: NoteId,
        respond_to: Option<oneshot::Sender<OpenOutcome>>,
    },

    /// Open every note, lowest first.
    OpenAll,

    /// Close a note window.
    CloseNote { id: NoteId },

    /// Open when closed, close when open.
    ToggleNote { id: NoteId },

    // ════════════════════════════════════════════════════════════════════════
    // Drag gestures
    // ════════════════════════════════════════════════════════════════════════
    BeginDrag { id: NoteId, operation: DragOperation },

    /// Pointer delta from the start of the gesture.
    DragBy {
        id: NoteId,
        dx: f64,
        dy: f64,
        /// Bypass grid snapping.
        free: bool,
    },

    CommitDrag { id: NoteId },

    CancelDrag { id: NoteId },

    // ════════════════════════════════════════════════════════════════════════
    // Links
    // ════════════════════════════════════════════════════════════════════════
    CreateLink { source: NoteId, target: NoteId },
    DeleteLink { id: LinkId },
    SetLinkDirected { id: LinkId, directed: bool },
    ReverseLink { id: LinkId },
    SetLinkLabel { id: LinkId, label: Option<String> },
    BeginLink { source: NoteId },
    CompleteLink { target: NoteId },
    CancelLink,

    // ════════════════════════════════════════════════════════════════════════
    // UI
    // ════════════════════════════════════════════════════════════════════════
    SetMode(UiMode),
    ToggleSnapToGrid,
    SetConnectStyle(ConnectStyle),
    SetSelectedNotes(Vec<NoteId>),
    SetSelectedLinks(Vec<LinkId>),
    ToggleNoteSelection { id: NoteId },
    ClearSelection,
    SetGridDensity(f64),
    ToggleSidebar,
    SetShowConnections(bool),

    // ════════════════════════════════════════════════════════════════════════
    // External windows
    // ════════════════════════════════════════════════════════════════════════
    TrackExternal(ExternalSnapshot),
    MoveExternal { id: ExternalId, rect: Rect },
    SetExternalHidden { id: ExternalId, hidden: bool },
    UntrackExternal { id: ExternalId },
    PruneExternals,
    RefreshExternals,

    // ════════════════════════════════════════════════════════════════════════
    // Layout
    // ════════════════════════════════════════════════════════════════════════
    /// Replace the board with the sample layout.
    ResetLayout,

    /// Save immediately; the responder receives the outcome of that save.
    Flush { respond_to: Option<oneshot::Sender<SaveStatus>> },

    // ════════════════════════════════════════════════════════════════════════
    // Executor results
    // ════════════════════════════════════════════════════════════════════════
    SpawnResolved {
        id: NoteId,
        attempt: u32,
        result: Result<(), HostError>,
    },

    HandshakeTimeout { id: NoteId, attempt: u32 },

    RectApplied { id: NoteId, result: Result<(), HostError> },

    ExternalsEnumerated(Result<Vec<ExternalSnapshot>, HostError>),

    PersistFinished {
        revision: u64,
        result: Result<(), HostError>,
    },

    // ════════════════════════════════════════════════════════════════════════
    // Control
    // ════════════════════════════════════════════════════════════════════════
    /// Query board data.
    Query {
        query: HubQuery,
        respond_to: oneshot::Sender<QueryResult>,
    },

    /// Stop the hub after a final save.
    Shutdown { respond_to: Option<oneshot::Sender<()>> },
}

impl HubMessage {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateNote { .. } => "CreateNote",
            Self::DeleteNote { .. } => "DeleteNote",
            Self::UndoDelete => "UndoDelete",
            Self::UpdateContent { .. } => "UpdateContent",
            Self::PatchNote { .. } => "PatchNote",
            Self::BringToFront { .. } => "BringToFront",
            Self::SetNoteRect { .. } => "SetNoteRect",
            Self::OpenNote { .. } => "OpenNote",
            Self::OpenAll => "OpenAll",
            Self::CloseNote { .. } => "CloseNote",
            Self::ToggleNote { .. } => "ToggleNote",
            Self::BeginDrag { .. } => "BeginDrag",
            Self::DragBy { .. } => "DragBy",
            Self::CommitDrag { .. } => "CommitDrag",
            Self::CancelDrag { .. } => "CancelDrag",
            Self::CreateLink { .. } => "CreateLink",
            Self::DeleteLink { .. } => "DeleteLink",
            Self::SetLinkDirected { .. } => "SetLinkDirected",
            Self::ReverseLink { .. } => "ReverseLink",
            Self::SetLinkLabel { .. } => "SetLinkLabel",
            Self::BeginLink { .. } => "BeginLink",
            Self::CompleteLink { .. } => "CompleteLink",
            Self::CancelLink => "CancelLink",
            Self::SetMode(_) => "SetMode",
            Self::ToggleSnapToGrid => "ToggleSnapToGrid",
            Self::SetConnectStyle(_) => "SetConnectStyle",
            Self::SetSelectedNotes(_) => "SetSelectedNotes",
            Self::SetSelectedLinks(_) => "SetSelectedLinks",
            Self::ToggleNoteSelection { .. } => "ToggleNoteSelection",
            Self::ClearSelection => "ClearSelection",
            Self::SetGridDensity(_) => "SetGridDensity",
            Self::ToggleSidebar => "ToggleSidebar",
            Self::SetShowConnections(_) => "SetShowConnections",
            Self::TrackExternal(_) => "TrackExternal",
            Self::MoveExternal { .. } => "MoveExternal",
            Self::SetExternalHidden { .. } => "SetExternalHidden",
            Self::UntrackExternal { .. } => "UntrackExternal",
            Self::PruneExternals => "PruneExternals",
            Self::RefreshExternals => "RefreshExternals",
            Self::ResetLayout => "ResetLayout",
            Self::Flush { .. } => "Flush",
            Self::SpawnResolved { .. } => "SpawnResolved",
            Self::HandshakeTimeout { .. } => "HandshakeTimeout",
            Self::RectApplied { .. } => "RectApplied",
            Self::ExternalsEnumerated(_) => "ExternalsEnumerated",
            Self::PersistFinished { .. } => "PersistFinished",
            Self::Query { .. } => "Query",
            Self::Shutdown { .. } => "Shutdown",
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Queries for board data.
#[derive(Debug, Clone)]
pub enum HubQuery {
    /// Full board snapshot.
    GetBoard,

    /// A single note.
    GetNote { id: NoteId },

    /// The overlay payload.
    GetOverlay,

    /// Connector paths for links between existing notes.
    GetConnectors { style: Option<ConnectStyle>, only_open: bool },

    /// Handshake phase of a note window.
    GetWindowPhase { id: NoteId },

    /// Active drag session for a note.
    GetDragSession { id: NoteId },

    GetLinkingDraft,

    /// Outcome of the last save.
    GetLastSave,

    GetRevision,
}

/// Results from queries.
#[derive(Debug, Clone)]
pub enum QueryResult {
    Board(Box<BoardState>),
    Note(Option<Box<Note>>),
    Overlay(Box<OverlayState>),
    Connectors(Vec<Connector>),
    WindowPhase(WindowPhase),
    DragSession(Option<DragSession>),
    LinkingDraft(LinkingDraft),
    LastSave(Option<SaveStatus>),
    Revision(u64),
}
