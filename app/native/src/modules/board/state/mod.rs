//! Board state types.
//!
//! The hub owns exactly one [`BoardState`]; every other component sees it
//! through snapshots, bus payloads, or the persisted layout document.

mod types;

pub use types::{
    BoardState, ConnectStyle, DEFAULT_GRID_DENSITY, DeletedNote, ExternalId, ExternalWindow,
    Link, LinkEndpoint, LinkId, NOTE_LABEL_PREFIX, Note, NoteId, NotePatch, Rect, RectOverrides,
    SubtaskRef, Trash, UiMode, UiState, WindowsUi,
};
