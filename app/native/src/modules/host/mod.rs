//! Capability surface the hub calls into.
//!
//! Native window creation, movement and destruction, and layout storage are
//! outside the sync core. The hub only sees the traits below; a desktop
//! shell implements them against its GUI toolkit, and [`headless`] provides
//! an in-process implementation backed by virtual windows.

pub mod headless;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::modules::board::state::{NoteId, Rect};

/// Errors reported by a capability call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The host refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The target window does not exist.
    #[error("window not found: {0}")]
    NotFound(String),

    /// The host cannot service requests right now.
    #[error("host unavailable: {0}")]
    Unavailable(String),

    /// Reading or writing backing storage failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self { Self::Storage(err.to_string()) }
}

/// Parameters for creating a note window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub id: NoteId,
    /// Native window label, `note-<id>`.
    pub label: String,
    pub rect: Rect,
}

impl SpawnRequest {
    #[must_use]
    pub fn new(id: NoteId, rect: Rect) -> Self {
        let label = id.window_label();
        Self { id, label, rect }
    }
}

/// A foreign OS window as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSnapshot {
    pub native_handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rect: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// Native window operations.
///
/// Every call is acknowledged: the returned future resolves once the host
/// has accepted or rejected the request. Events the operation triggers
/// (a window reporting ready, moved, closed) arrive separately on the bus
/// with no ordering guarantee relative to the acknowledgement.
pub trait WindowHost: Send + Sync + 'static {
    fn spawn_window(
        &self,
        request: SpawnRequest,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn focus_window(&self, id: NoteId) -> impl Future<Output = Result<(), HostError>> + Send;

    fn close_window(&self, id: NoteId) -> impl Future<Output = Result<(), HostError>> + Send;

    fn set_window_rect(
        &self,
        id: NoteId,
        rect: Rect,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn enumerate_windows(
        &self,
    ) -> impl Future<Output = Result<Vec<ExternalSnapshot>, HostError>> + Send;

    fn move_external_window(
        &self,
        native_handle: String,
        rect: Rect,
    ) -> impl Future<Output = Result<(), HostError>> + Send;
}

/// Storage for the single layout document.
pub trait LayoutGateway: Send + Sync + 'static {
    /// Replace the stored document.
    fn persist(&self, document: String) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Read the stored document; `None` when nothing was ever saved.
    fn load(&self) -> impl Future<Output = Result<Option<String>, HostError>> + Send;
}
