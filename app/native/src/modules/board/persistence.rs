//! Layout document encoding, normalization, and file storage.
//!
//! The board is persisted as a single pretty-printed JSON document. Loading
//! is lenient: whatever the document omits is defaulted, and the result is
//! normalized so the hub starts from a consistent state:
//!
//! - every note starts closed (`isOpen` is forced to `false`)
//! - notes without `z` are stacked above the highest present `z`, in
//!   document order
//! - a missing or dangling `focusedNoteId` points at the front-most note
//! - links in the legacy `{sourceId, targetId}` shape become note endpoints
//! - a rect with missing or non-positive fields is completed from a fallback
//! - a note, link or external that cannot be read at all is skipped on its own
//!
//! A document that is not JSON at all is an error; the hub then falls back
//! to [`sample_board`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use super::state::{
    BoardState, ConnectStyle, ExternalId, ExternalWindow, Link, LinkEndpoint, LinkId, Note,
    NoteId, Rect, UiMode, UiState,
};
use crate::error::HinotesError;
use crate::modules::host::{HostError, LayoutGateway};

/// Rect given to notes stored without one.
const FALLBACK_RECT: Rect = Rect::new(100.0, 100.0, 300.0, 200.0);

// ============================================================================
// Codec
// ============================================================================

/// Serialize the board as a layout document.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(state: &BoardState) -> Result<String, HinotesError> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Parse and normalize a layout document.
///
/// # Errors
///
/// Returns [`HinotesError::PersistenceError`] if the document is not valid
/// JSON or its shape cannot be interpreted as a board.
pub fn decode(document: &str) -> Result<BoardState, HinotesError> {
    Ok(serde_json::from_str(document)?)
}

impl<'de> Deserialize<'de> for BoardState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        RawBoard::deserialize(deserializer).map(Self::from)
    }
}

/// Map that keeps document order, so back-filled `z` follows it.
struct Ordered<K, V>(Vec<(K, V)>);

impl<K, V> Default for Ordered<K, V> {
    fn default() -> Self { Self(Vec::new()) }
}

impl<'de, K: Deserialize<'de>, V: Deserialize<'de>> Deserialize<'de> for Ordered<K, V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<K, V>(PhantomData<(K, V)>);

        impl<'de, K: Deserialize<'de>, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<K, V> {
            type Value = Ordered<K, V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(Ordered(entries))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(Ordered::default())
            }
        }

        deserializer.deserialize_any(OrderedVisitor(PhantomData))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBoard {
    #[serde(default)]
    notes: Ordered<NoteId, serde_json::Value>,
    #[serde(default)]
    links: Ordered<LinkId, serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    ui: Option<UiState>,
    #[serde(default)]
    externals: Option<Ordered<ExternalId, serde_json::Value>>,
}

/// Deserialize any value, reading a value of the wrong shape as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A finite number, integer or not.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

/// A stacking order. `2.0` reads as `2`; negative values read as absent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_z<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let z = lenient_f64(deserializer)?;
    Ok(z.filter(|z| (0.0..=f64::from(u32::MAX)).contains(z)).map(|z| z.round() as u32))
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawRect {
    #[serde(deserialize_with = "lenient_f64")]
    x: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    y: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    width: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    height: Option<f64>,
}

impl RawRect {
    /// Fill missing fields from the fallback rect. Sizes must be positive.
    fn resolve(self) -> Rect {
        Rect::new(
            self.x.unwrap_or(FALLBACK_RECT.x),
            self.y.unwrap_or(FALLBACK_RECT.y),
            self.width.filter(|w| *w > 0.0).unwrap_or(FALLBACK_RECT.width),
            self.height.filter(|h| *h > 0.0).unwrap_or(FALLBACK_RECT.height),
        )
    }
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawNote {
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    content: Option<String>,
    #[serde(deserialize_with = "lenient")]
    rect: Option<RawRect>,
    #[serde(deserialize_with = "lenient_z")]
    z: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    hidden: Option<bool>,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawExternal {
    #[serde(deserialize_with = "lenient")]
    native_handle: Option<String>,
    #[serde(deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    rect: Option<RawRect>,
    #[serde(deserialize_with = "lenient_z")]
    z: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    is_bound: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    hidden: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    exe: Option<String>,
    #[serde(deserialize_with = "lenient")]
    class_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLink {
    Endpoints {
        source: LinkEndpoint,
        target: LinkEndpoint,
        #[serde(default, deserialize_with = "lenient")]
        directed: Option<bool>,
        #[serde(default, deserialize_with = "lenient")]
        label: Option<String>,
    },
    Legacy {
        #[serde(rename = "sourceId")]
        source_id: NoteId,
        #[serde(rename = "targetId")]
        target_id: NoteId,
        #[serde(default, deserialize_with = "lenient")]
        directed: Option<bool>,
        #[serde(default, deserialize_with = "lenient")]
        label: Option<String>,
    },
}

/// Parse every record on its own, dropping the ones that cannot be read.
fn records<K: fmt::Display, T: DeserializeOwned>(
    kind: &'static str,
    entries: Ordered<K, serde_json::Value>,
) -> Vec<(K, T)> {
    entries
        .0
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value(value) {
            Ok(record) => Some((id, record)),
            Err(err) => {
                tracing::warn!(kind, %id, error = %err, "layout: skipping unreadable record");
                None
            }
        })
        .collect()
}

/// Highest stored `z`; records without one are stacked above it in document
/// order.
fn max_z<K, T>(records: &[(K, T)], z: impl Fn(&T) -> Option<u32>) -> u32 {
    records.iter().filter_map(|(_, r)| z(r)).max().unwrap_or(0)
}

impl From<RawBoard> for BoardState {
    fn from(raw: RawBoard) -> Self {
        let raw_notes: Vec<(NoteId, RawNote)> = records("note", raw.notes);
        let mut next_z = max_z(&raw_notes, |n| n.z);

        let notes: BTreeMap<NoteId, Note> = raw_notes
            .into_iter()
            .map(|(id, raw)| {
                let note = Note {
                    id: id.clone(),
                    title: raw.title.unwrap_or_default(),
                    content: raw.content.unwrap_or_default(),
                    rect: raw.rect.map_or(FALLBACK_RECT, RawRect::resolve),
                    z: raw.z.unwrap_or_else(|| {
                        next_z = next_z.saturating_add(1);
                        next_z
                    }),
                    color: raw.color,
                    is_open: false,
                    hidden: raw.hidden,
                };
                (id, note)
            })
            .collect();

        let links = records("link", raw.links)
            .into_iter()
            .map(|(id, raw)| {
                let link = match raw {
                    RawLink::Endpoints { source, target, directed, label } => {
                        Link { id: id.clone(), source, target, directed, label }
                    }
                    RawLink::Legacy { source_id, target_id, directed, label } => Link {
                        id: id.clone(),
                        source: LinkEndpoint::Note { id: source_id },
                        target: LinkEndpoint::Note { id: target_id },
                        directed,
                        label,
                    },
                };
                (id, link)
            })
            .collect();

        let externals = raw.externals.map(|entries| {
            let raw_externals: Vec<(ExternalId, RawExternal)> = records("external", entries);
            let mut next_z = max_z(&raw_externals, |e| e.z);
            raw_externals
                .into_iter()
                .map(|(id, raw)| {
                    let external = ExternalWindow {
                        id: id.clone(),
                        native_handle: raw.native_handle.unwrap_or_default(),
                        title: raw.title,
                        rect: raw.rect.map_or(FALLBACK_RECT, RawRect::resolve),
                        z: raw.z.unwrap_or_else(|| {
                            next_z = next_z.saturating_add(1);
                            next_z
                        }),
                        is_bound: raw.is_bound.unwrap_or(false),
                        hidden: raw.hidden,
                        exe: raw.exe,
                        class_name: raw.class_name,
                    };
                    (id, external)
                })
                .collect()
        });

        let mut state = Self { notes, links, ui: raw.ui.unwrap_or_default(), externals };

        let focus_valid =
            state.ui.focused_note_id.as_ref().is_some_and(|id| state.notes.contains_key(id));
        if !focus_valid {
            state.ui.focused_note_id = state.top_note().map(|n| n.id.clone());
        }
        state
    }
}

// ============================================================================
// Sample Board
// ============================================================================

/// The six-note, seven-link board seeded on first run and by "reset".
#[must_use]
pub fn sample_board() -> BoardState {
    const NOTES: [(&str, &str, &str, Rect, &str); 6] = [
        (
            "note-1",
            "Welcome to HierarchyNotes",
            "This is a sample note. You can edit the content, move and resize the window, and create links to other notes.",
            Rect::new(100.0, 100.0, 300.0, 200.0),
            "#64748b",
        ),
        (
            "note-2",
            "Project Goals",
            "- Multi-window support\n- Live connectors\n- Local persistence\n- Clean minimal UI",
            Rect::new(500.0, 100.0, 280.0, 180.0),
            "#6366f1",
        ),
        (
            "note-3",
            "Features",
            "Each note is a native OS window. The Board shows relationship lines that update in real-time.",
            Rect::new(300.0, 350.0, 300.0, 160.0),
            "#8b5cf6",
        ),
        (
            "note-4",
            "Architecture",
            "Built with Tauri v2, React, TypeScript, and Zustand for state management.",
            Rect::new(700.0, 350.0, 280.0, 160.0),
            "#ec4899",
        ),
        (
            "note-5",
            "Try It Out",
            "Press N to create a new note. Move and resize windows to see connectors update.",
            Rect::new(100.0, 550.0, 280.0, 140.0),
            "#f59e0b",
        ),
        (
            "note-6",
            "Persistence",
            "Your layout is automatically saved and restored on app restart.",
            Rect::new(500.0, 550.0, 280.0, 140.0),
            "#10b981",
        ),
    ];
    const LINKS: [(&str, &str, &str, bool); 7] = [
        ("link-1", "note-1", "note-2", true),
        ("link-2", "note-1", "note-3", true),
        ("link-3", "note-2", "note-4", true),
        ("link-4", "note-3", "note-4", false),
        ("link-5", "note-3", "note-5", true),
        ("link-6", "note-4", "note-6", true),
        ("link-7", "note-5", "note-6", false),
    ];

    let mut state = BoardState::default();
    for (z, (id, title, content, rect, color)) in (1..).zip(NOTES) {
        let mut note = Note::new(NoteId::new(id), title, rect, z);
        note.content = content.to_string();
        note.color = Some(color.to_string());
        state.notes.insert(note.id.clone(), note);
    }
    for (id, source, target, directed) in LINKS {
        let link = Link::between_notes(LinkId::new(id), source.into(), target.into(), directed);
        state.links.insert(link.id.clone(), link);
    }
    state.ui = UiState {
        mode: UiMode::Select,
        snap_to_grid: true,
        connect_style: ConnectStyle::Smooth,
        ..UiState::default()
    };
    state
}

// ============================================================================
// File Gateway
// ============================================================================

/// Stores the layout document as a JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash mid-write never leaves a truncated layout.
#[derive(Debug, Clone)]
pub struct JsonFileLayout {
    path: PathBuf,
}

impl JsonFileLayout {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self { Self { path } }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn write(path: &Path, document: &str) -> Result<(), HostError> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(document.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|err| HostError::from(err.error))?;
        Ok(())
    }

    fn read(path: &Path) -> Result<Option<String>, HostError> {
        match std::fs::read_to_string(path) {
            Ok(document) => Ok(Some(document)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

impl LayoutGateway for JsonFileLayout {
    async fn persist(&self, document: String) -> Result<(), HostError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::write(&path, &document))
            .await
            .map_err(|err| HostError::Unavailable(err.to_string()))?
    }

    async fn load(&self) -> Result<Option<String>, HostError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::read(&path))
            .await
            .map_err(|err| HostError::Unavailable(err.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_closes_notes() {
        let mut state = sample_board();
        for note in state.notes.values_mut() {
            note.is_open = true;
        }
        state.ui.focused_note_id = Some(NoteId::new("note-3"));

        let decoded = decode(&encode(&state).unwrap()).unwrap();

        let mut expected = state.clone();
        for note in expected.notes.values_mut() {
            note.is_open = false;
        }
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_sample_board_shape() {
        let board = sample_board();
        assert_eq!(board.notes.len(), 6);
        assert_eq!(board.links.len(), 7);
        assert_eq!(board.notes["note-6"].z, 6);
        assert_eq!(board.notes["note-1"].title, "Welcome to HierarchyNotes");
        assert!(!board.links["link-4"].is_directed());
        assert!(board.links["link-6"].is_directed());
        assert_eq!(board.ui.grid_density, 40.0);
    }

    #[test]
    fn test_missing_z_backfilled_in_document_order() {
        let document = r#"{
            "notes": {
                "b": { "title": "B", "rect": { "x": 0, "y": 0, "width": 10, "height": 10 } },
                "a": { "title": "A", "z": 5, "rect": { "x": 0, "y": 0, "width": 10, "height": 10 } },
                "c": { "title": "C" }
            }
        }"#;
        let board = decode(document).unwrap();
        assert_eq!(board.notes["a"].z, 5);
        assert_eq!(board.notes["b"].z, 6);
        assert_eq!(board.notes["c"].z, 7);
        assert_eq!(board.notes["c"].rect, FALLBACK_RECT);
        assert_eq!(board.ui.focused_note_id, Some(NoteId::new("c")));
    }

    #[test]
    fn test_is_open_forced_false() {
        let document = r#"{ "notes": { "n": { "title": "N", "z": 1, "isOpen": true } } }"#;
        assert!(!decode(document).unwrap().notes["n"].is_open);
    }

    #[test]
    fn test_missing_ui_fields_defaulted() {
        let document = r#"{ "notes": {}, "links": {}, "ui": { "mode": "connect" } }"#;
        let board = decode(document).unwrap();
        assert_eq!(board.ui.mode, UiMode::Connect);
        assert!(board.ui.snap_to_grid);
        assert_eq!(board.ui.grid_density, 40.0);
        assert!(board.ui.windows.show_connections);
        assert_eq!(board.ui.focused_note_id, None);
    }

    #[test]
    fn test_dangling_focus_reset() {
        let document = r#"{
            "notes": { "x": { "title": "X", "z": 2 }, "y": { "title": "Y", "z": 9 } },
            "ui": { "focusedNoteId": "gone" }
        }"#;
        assert_eq!(decode(document).unwrap().ui.focused_note_id, Some(NoteId::new("y")));
    }

    #[test]
    fn test_legacy_links_upgraded() {
        let document = r#"{
            "notes": {},
            "links": {
                "l1": { "id": "l1", "sourceId": "a", "targetId": "b", "directed": true },
                "l2": { "id": "l2", "source": { "kind": "note", "id": "b" }, "target": { "kind": "note", "id": "c" } }
            }
        }"#;
        let board = decode(document).unwrap();
        assert_eq!(board.links["l1"].source, LinkEndpoint::note("a"));
        assert_eq!(board.links["l1"].target, LinkEndpoint::note("b"));
        assert!(board.links["l1"].is_directed());
        assert_eq!(board.links["l2"].directed, None);
    }

    #[test]
    fn test_empty_and_null_documents() {
        assert_eq!(decode("{}").unwrap(), BoardState::default());
        assert!(decode(r#"{ "notes": null }"#).unwrap().notes.is_empty());
    }

    #[test]
    fn test_rect_missing_height_is_completed() {
        let document = r#"{
            "notes": { "n": { "title": "N", "z": 1, "rect": { "x": 10, "y": 20, "width": 240 } } }
        }"#;
        let board = decode(document).unwrap();
        assert_eq!(board.notes["n"].rect, Rect::new(10.0, 20.0, 240.0, FALLBACK_RECT.height));
    }

    #[test]
    fn test_fractional_z_accepted() {
        let document = r#"{
            "notes": {
                "a": { "title": "A", "z": 2.0 },
                "b": { "title": "B", "z": -3 },
                "c": { "title": "C", "z": "high" }
            }
        }"#;
        let board = decode(document).unwrap();
        assert_eq!(board.notes["a"].z, 2);
        assert_eq!(board.notes["b"].z, 3);
        assert_eq!(board.notes["c"].z, 4);
    }

    #[test]
    fn test_external_missing_fields_defaulted() {
        let document = r#"{
            "notes": {},
            "externals": {
                "e1": { "nativeHandle": "0x1", "rect": { "x": 0, "y": 0, "width": 50, "height": 40 }, "z": 2.0, "isBound": true },
                "e2": { "nativeHandle": "0x2", "title": "Terminal", "rect": { "x": 5, "y": 5, "width": 50, "height": 40 } }
            }
        }"#;
        let externals = decode(document).unwrap().externals.unwrap();

        assert_eq!(externals["e1"].z, 2);
        assert!(externals["e1"].is_bound);
        assert_eq!(externals["e2"].id, ExternalId::new("e2"));
        assert_eq!(externals["e2"].z, 3);
        assert!(!externals["e2"].is_bound);
        assert_eq!(externals["e2"].title.as_deref(), Some("Terminal"));
    }

    #[test]
    fn test_unreadable_records_skipped() {
        let document = r#"{
            "notes": { "good": { "title": "Good", "z": 1 }, "bad": 42 },
            "links": {
                "l1": { "sourceId": "good", "targetId": "good" },
                "l2": { "label": "no endpoints" }
            },
            "ui": "not an object"
        }"#;
        let board = decode(document).unwrap();
        assert_eq!(board.notes.len(), 1);
        assert!(board.notes.contains_key("good"));
        assert_eq!(board.links.len(), 1);
        assert!(board.links.contains_key("l1"));
        assert_eq!(board.ui.focused_note_id, Some(NoteId::new("good")));
    }

    #[test]
    fn test_non_json_is_an_error() {
        assert!(matches!(decode("not json"), Err(HinotesError::PersistenceError(_))));
    }

    #[tokio::test]
    async fn test_file_gateway_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let layout = JsonFileLayout::new(dir.path().join("nested").join("layout.json"));

        assert_eq!(layout.load().await.unwrap(), None);

        let document = encode(&sample_board()).unwrap();
        layout.persist(document.clone()).await.unwrap();
        assert_eq!(layout.load().await.unwrap(), Some(document));

        layout.persist("{}".to_string()).await.unwrap();
        assert_eq!(layout.load().await.unwrap().as_deref(), Some("{}"));
    }
}
