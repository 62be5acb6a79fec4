//! Typed payloads for every bus channel.
//!
//! A [`BusEvent`] serializes as `{ "channel": "<name>", "payload": {...} }`
//! where `<name>` is one of the constants in [`crate::events`].

use serde::{Deserialize, Serialize};

use crate::events;
use crate::modules::board::overlay::OverlayState;
use crate::modules::board::state::{NoteId, Rect};

/// Payload carrying only a note id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRef {
    pub id: NoteId,
}

/// Payload for `note:moved` and `note:resized`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoteRect {
    pub id: NoteId,
    pub rect: Rect,
}

/// Payload for `note:content_changed`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChanged {
    pub id: NoteId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Payload for `note:hydrate`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hydrate {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Payload for `persist:fail`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Empty payload, serialized as `{}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Every message that travels on the bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload")]
pub enum BusEvent {
    #[serde(rename = "note:moved")]
    NoteMoved(NoteRect),
    #[serde(rename = "note:resized")]
    NoteResized(NoteRect),
    #[serde(rename = "note:focused")]
    NoteFocused(NoteRef),
    #[serde(rename = "note:blurred")]
    NoteBlurred(NoteRef),
    #[serde(rename = "note:closed")]
    NoteClosed(NoteRef),
    #[serde(rename = "note:content_changed")]
    NoteContentChanged(ContentChanged),
    #[serde(rename = "note:ready")]
    NoteReady(NoteRef),
    #[serde(rename = "note:request_hydrate")]
    NoteRequestHydrate(NoteRef),
    #[serde(rename = "note:hydrate")]
    NoteHydrate(Hydrate),
    #[serde(rename = "persist:ok")]
    PersistOk(Empty),
    #[serde(rename = "persist:fail")]
    PersistFail(PersistFailure),
    #[serde(rename = "overlay-state-sync")]
    OverlayStateSync(Box<OverlayState>),
}

impl BusEvent {
    /// The channel name this event travels on.
    #[must_use]
    pub const fn channel(&self) -> &'static str {
        match self {
            Self::NoteMoved(_) => events::note::MOVED,
            Self::NoteResized(_) => events::note::RESIZED,
            Self::NoteFocused(_) => events::note::FOCUSED,
            Self::NoteBlurred(_) => events::note::BLURRED,
            Self::NoteClosed(_) => events::note::CLOSED,
            Self::NoteContentChanged(_) => events::note::CONTENT_CHANGED,
            Self::NoteReady(_) => events::note::READY,
            Self::NoteRequestHydrate(_) => events::note::REQUEST_HYDRATE,
            Self::NoteHydrate(_) => events::note::HYDRATE,
            Self::PersistOk(_) => events::persist::OK,
            Self::PersistFail(_) => events::persist::FAIL,
            Self::OverlayStateSync(_) => events::overlay::STATE_SYNC,
        }
    }

    /// The note this event concerns, for note-scoped channels.
    #[must_use]
    pub const fn note_id(&self) -> Option<&NoteId> {
        match self {
            Self::NoteMoved(NoteRect { id, .. })
            | Self::NoteResized(NoteRect { id, .. })
            | Self::NoteFocused(NoteRef { id })
            | Self::NoteBlurred(NoteRef { id })
            | Self::NoteClosed(NoteRef { id })
            | Self::NoteContentChanged(ContentChanged { id, .. })
            | Self::NoteReady(NoteRef { id })
            | Self::NoteRequestHydrate(NoteRef { id })
            | Self::NoteHydrate(Hydrate { id, .. }) => Some(id),
            Self::PersistOk(_) | Self::PersistFail(_) | Self::OverlayStateSync(_) => None,
        }
    }

    /// Whether a note window emitted this event (as opposed to the hub).
    #[must_use]
    pub const fn is_from_window(&self) -> bool {
        matches!(
            self,
            Self::NoteMoved(_)
                | Self::NoteResized(_)
                | Self::NoteFocused(_)
                | Self::NoteBlurred(_)
                | Self::NoteClosed(_)
                | Self::NoteContentChanged(_)
                | Self::NoteReady(_)
                | Self::NoteRequestHydrate(_)
        )
    }

    #[must_use]
    pub fn moved(id: NoteId, rect: Rect) -> Self { Self::NoteMoved(NoteRect { id, rect }) }

    #[must_use]
    pub fn resized(id: NoteId, rect: Rect) -> Self { Self::NoteResized(NoteRect { id, rect }) }
}
