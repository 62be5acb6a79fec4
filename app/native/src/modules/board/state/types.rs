//! Core state types for the note board.
//!
//! These types form a relational structure:
//! - `Note` is one note, rendered by its own native window when open
//! - `Link` connects two endpoints; today only `LinkEndpoint::Note` resolves
//! - `ExternalWindow` is a foreign OS window surfaced on the board for layout
//!
//! Relations:
//! - `Link.source` / `Link.target` → `Note.id` (for note endpoints)
//! - `UiState.selected_note_ids` → list of `Note.id`
//! - `UiState.focused_note_id` → `Note.id`

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

            /// Generate a fresh, time-ordered identifier.
            #[must_use]
            pub fn generate() -> Self { Self(uuid::Uuid::now_v7().simple().to_string()) }

            #[must_use]
            pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str { &self.0 }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self { Self(id.to_string()) }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self { Self(id) }
        }
    };
}

string_id!(
    /// Stable identifier of a note for its whole lifetime.
    NoteId
);
string_id!(
    /// Identifier of a link.
    LinkId
);
string_id!(
    /// Identifier of a tracked external window tile.
    ExternalId
);

/// Prefix shared by every note window label.
pub const NOTE_LABEL_PREFIX: &str = "note-";

impl NoteId {
    /// Native window label for this note.
    ///
    /// Ids that already carry the `note-` prefix are used as-is so the label
    /// and the store key stay identical.
    #[must_use]
    pub fn window_label(&self) -> String {
        if self.0.starts_with(NOTE_LABEL_PREFIX) {
            self.0.clone()
        } else {
            format!("{NOTE_LABEL_PREFIX}{}", self.0)
        }
    }
}

// ============================================================================
// Geometry Types
// ============================================================================

/// A rectangle in logical board coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn right(&self) -> f64 { self.x + self.width }

    #[must_use]
    pub fn bottom(&self) -> f64 { self.y + self.height }

    /// Whether the top-left corner differs from `other`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn position_differs(&self, other: &Self) -> bool { self.x != other.x || self.y != other.y }

    /// Whether the size differs from `other`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn size_differs(&self, other: &Self) -> bool {
        self.width != other.width || self.height != other.height
    }
}

/// Partial rect used when creating a note; unset fields take defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectOverrides {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl RectOverrides {
    #[must_use]
    pub fn apply(&self, base: Rect) -> Rect {
        Rect {
            x: self.x.unwrap_or(base.x),
            y: self.y.unwrap_or(base.y),
            width: self.width.unwrap_or(base.width),
            height: self.height.unwrap_or(base.height),
        }
    }
}

// ============================================================================
// Note
// ============================================================================

/// A note on the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub rect: Rect,
    /// Stacking order; the front-most note has the highest value.
    pub z: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Whether a live window currently represents this note.
    #[serde(default)]
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl Note {
    #[must_use]
    pub fn new(id: NoteId, title: impl Into<String>, rect: Rect, z: u32) -> Self {
        Self {
            id,
            title: title.into(),
            content: String::new(),
            rect,
            z,
            color: None,
            is_open: false,
            hidden: None,
        }
    }
}

/// Inspector-level edits to a note. Unset fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` clears the color.
    pub color: Option<Option<String>>,
    pub hidden: Option<bool>,
}

// ============================================================================
// Links
// ============================================================================

/// Reference to a subtask inside a note. Reserved; never rendered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRef {
    pub note_id: NoteId,
    pub subtask_id: String,
}

/// One end of a link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkEndpoint {
    Note { id: NoteId },
    Subtask {
        #[serde(rename = "ref")]
        subtask: SubtaskRef,
    },
}

impl LinkEndpoint {
    #[must_use]
    pub fn note(id: impl Into<NoteId>) -> Self { Self::Note { id: id.into() } }

    /// The note id when this endpoint resolves directly to a note.
    #[must_use]
    pub const fn note_id(&self) -> Option<&NoteId> {
        match self {
            Self::Note { id } => Some(id),
            Self::Subtask { .. } => None,
        }
    }

    /// The note this endpoint belongs to, including the owner of a subtask.
    #[must_use]
    pub const fn owning_note(&self) -> &NoteId {
        match self {
            Self::Note { id } => id,
            Self::Subtask { subtask } => &subtask.note_id,
        }
    }
}

/// A relationship between two endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub source: LinkEndpoint,
    pub target: LinkEndpoint,
    /// Parent to child when true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Link {
    #[must_use]
    pub fn between_notes(id: LinkId, source: NoteId, target: NoteId, directed: bool) -> Self {
        Self {
            id,
            source: LinkEndpoint::Note { id: source },
            target: LinkEndpoint::Note { id: target },
            directed: Some(directed),
            label: None,
        }
    }

    #[must_use]
    pub fn is_directed(&self) -> bool { self.directed.unwrap_or(false) }

    /// Whether the link touches `note`, through either endpoint.
    #[must_use]
    pub fn references(&self, note: &str) -> bool {
        self.source.owning_note().as_str() == note || self.target.owning_note().as_str() == note
    }

    /// Whether both endpoints are notes forming the unordered pair `{a, b}`.
    #[must_use]
    pub fn connects_pair(&self, a: &str, b: &str) -> bool {
        match (self.source.note_id(), self.target.note_id()) {
            (Some(s), Some(t)) => {
                (s.as_str() == a && t.as_str() == b) || (s.as_str() == b && t.as_str() == a)
            }
            _ => false,
        }
    }
}

// ============================================================================
// External Windows
// ============================================================================

/// A foreign OS window shown on the board as a tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalWindow {
    pub id: ExternalId,
    /// OS-specific handle, as reported by the window host.
    pub native_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rect: Rect,
    pub z: u32,
    /// False once the handle no longer resolves; the tile remains as a ghost.
    pub is_bound: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

// ============================================================================
// UI State
// ============================================================================

/// Board interaction mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    #[default]
    Select,
    Connect,
    Resize,
}

/// Connector rendering style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectStyle {
    #[default]
    Smooth,
    Orthogonal,
}

/// The most recently deleted note, kept for a single undo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNote {
    pub note: Note,
    /// Milliseconds since the Unix epoch.
    pub deleted_at: u64,
}

/// One-slot undo buffer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Trash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_deleted: Option<DeletedNote>,
}

/// Per-window presentation toggles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowsUi {
    /// Draw connectors between open note windows on the overlay.
    pub show_connections: bool,
}

impl Default for WindowsUi {
    fn default() -> Self { Self { show_connections: true } }
}

/// Presentation state of the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UiState {
    pub mode: UiMode,
    pub snap_to_grid: bool,
    pub connect_style: ConnectStyle,
    pub selected_note_ids: Vec<NoteId>,
    pub selected_link_ids: Vec<LinkId>,
    /// Grid spacing in pixels.
    pub grid_density: f64,
    pub focused_note_id: Option<NoteId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidebar_collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trash: Option<Trash>,
    pub windows: WindowsUi,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            mode: UiMode::Select,
            snap_to_grid: true,
            connect_style: ConnectStyle::Smooth,
            selected_note_ids: Vec::new(),
            selected_link_ids: Vec::new(),
            grid_density: DEFAULT_GRID_DENSITY,
            focused_note_id: None,
            sidebar_collapsed: None,
            trash: None,
            windows: WindowsUi::default(),
        }
    }
}

/// Grid density used when none is configured.
pub const DEFAULT_GRID_DENSITY: f64 = 40.0;

// ============================================================================
// Board State
// ============================================================================

/// The whole persisted document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub notes: BTreeMap<NoteId, Note>,
    pub links: BTreeMap<LinkId, Link>,
    pub ui: UiState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub externals: Option<BTreeMap<ExternalId, ExternalWindow>>,
}

impl BoardState {
    /// Highest z among notes, or 0 for an empty board.
    #[must_use]
    pub fn max_z(&self) -> u32 { self.notes.values().map(|n| n.z).max().unwrap_or(0) }

    /// The front-most note, ties broken by id.
    #[must_use]
    pub fn top_note(&self) -> Option<&Note> { self.notes.values().max_by_key(|n| n.z) }

    #[must_use]
    pub fn note(&self, id: &str) -> Option<&Note> { self.notes.get(id) }

    pub fn note_mut(&mut self, id: &str) -> Option<&mut Note> { self.notes.get_mut(id) }

    /// Number of currently open note windows.
    #[must_use]
    pub fn open_count(&self) -> usize { self.notes.values().filter(|n| n.is_open).count() }
}
