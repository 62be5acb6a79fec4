//! Derived connector views.
//!
//! Connectors are recomputed from the current rectangles on every board
//! revision. Only links whose endpoints are both notes are drawable; reserved
//! subtask endpoints fall through and produce nothing.

use serde::{Deserialize, Serialize};

use super::geometry::{AnchorPair, best_anchor_pair};
use super::path::build_pair_path;
use super::state::{BoardState, ConnectStyle, Link, LinkEndpoint, LinkId, Note, NoteId};

/// A drawable connector between two notes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connector {
    pub link_id: LinkId,
    pub source: NoteId,
    pub target: NoteId,
    pub directed: bool,
    pub anchors: AnchorPair,
    /// SVG path data.
    pub path: String,
}

/// Payload of `overlay-state-sync`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub notes: Vec<Note>,
    pub links: Vec<Link>,
    pub show_connections: bool,
    pub connect_style: ConnectStyle,
}

impl OverlayState {
    #[must_use]
    pub fn from_board(state: &BoardState) -> Self {
        Self {
            notes: state.notes.values().cloned().collect(),
            links: state.links.values().cloned().collect(),
            show_connections: state.ui.windows.show_connections,
            connect_style: state.ui.connect_style,
        }
    }
}

/// Resolve a link to its two notes when both endpoints are drawable.
fn resolve<'a>(state: &'a BoardState, link: &Link) -> Option<(&'a Note, &'a Note)> {
    match (&link.source, &link.target) {
        (LinkEndpoint::Note { id: source }, LinkEndpoint::Note { id: target }) => {
            Some((state.note(source.as_str())?, state.note(target.as_str())?))
        }
        _ => None,
    }
}

/// Compute connectors for every drawable link.
///
/// With `only_open`, links touching a closed note are skipped, matching what
/// the overlay can show between live windows.
#[must_use]
pub fn connector_paths(state: &BoardState, style: ConnectStyle, only_open: bool) -> Vec<Connector> {
    state
        .links
        .values()
        .filter_map(|link| {
            let (source, target) = resolve(state, link)?;
            if only_open && !(source.is_open && target.is_open) {
                return None;
            }

            let anchors = best_anchor_pair(&source.rect, &target.rect);
            Some(Connector {
                link_id: link.id.clone(),
                source: source.id.clone(),
                target: target.id.clone(),
                directed: link.is_directed(),
                path: build_pair_path(&anchors, style),
                anchors,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::board::state::{Rect, SubtaskRef};

    fn board() -> BoardState {
        let mut state = BoardState::default();
        for (id, x, open) in [("a", 0.0, true), ("b", 500.0, true), ("c", 1000.0, false)] {
            let mut note = Note::new(NoteId::new(id), id, Rect::new(x, 0.0, 300.0, 200.0), 1);
            note.is_open = open;
            state.notes.insert(note.id.clone(), note);
        }
        let ab = Link::between_notes("ab".into(), "a".into(), "b".into(), true);
        let bc = Link::between_notes("bc".into(), "b".into(), "c".into(), false);
        let sub = Link {
            id: "sub".into(),
            source: LinkEndpoint::note("a"),
            target: LinkEndpoint::Subtask {
                subtask: SubtaskRef { note_id: "b".into(), subtask_id: "s1".into() },
            },
            directed: None,
            label: None,
        };
        for link in [ab, bc, sub] {
            state.links.insert(link.id.clone(), link);
        }
        state
    }

    #[test]
    fn test_connectors_skip_subtask_endpoints() {
        let connectors = connector_paths(&board(), ConnectStyle::Smooth, false);
        let ids: Vec<&str> = connectors.iter().map(|c| c.link_id.as_str()).collect();
        assert_eq!(ids, vec!["ab", "bc"]);
    }

    #[test]
    fn test_connectors_only_open() {
        let connectors = connector_paths(&board(), ConnectStyle::Orthogonal, true);
        assert_eq!(connectors.len(), 1);
        assert_eq!(connectors[0].link_id.as_str(), "ab");
        assert!(connectors[0].directed);
        assert!(connectors[0].path.starts_with("M 300 100 L"));
    }

    #[test]
    fn test_connectors_skip_missing_notes() {
        let mut state = board();
        state.notes.remove("b");
        assert!(connector_paths(&state, ConnectStyle::Smooth, false).is_empty());
    }

    #[test]
    fn test_overlay_state_mirrors_ui() {
        let mut state = board();
        state.ui.windows.show_connections = false;
        state.ui.connect_style = ConnectStyle::Orthogonal;
        let overlay = OverlayState::from_board(&state);
        assert_eq!(overlay.notes.len(), 3);
        assert_eq!(overlay.links.len(), 3);
        assert!(!overlay.show_connections);
        assert_eq!(overlay.connect_style, ConnectStyle::Orthogonal);
    }
}
