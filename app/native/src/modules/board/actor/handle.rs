//! Handle for communicating with the hub actor.
//!
//! The `HubHandle` provides a cloneable interface for sending commands to
//! the hub and querying the board.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::messages::{HubMessage, HubQuery, QueryResult};
use crate::modules::board::overlay::Connector;
use crate::modules::board::state::{BoardState, ConnectStyle, Note, NoteId, RectOverrides};
use crate::modules::board::store::{OpenOutcome, SaveStatus, WindowPhase};

/// Error types for actor communication.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to actor: channel closed")]
    SendFailed,

    /// Failed to receive response from actor.
    #[error("Failed to receive response from actor: channel closed")]
    ReceiveFailed,

    /// Query timed out.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// The actor answered with a result of the wrong kind.
    #[error("Unexpected query result: {0}")]
    UnexpectedResult(&'static str),
}

/// Handle for communicating with the hub actor.
///
/// This handle is cheap to clone. The hub stops once every handle is
/// dropped.
#[derive(Clone, Debug)]
pub struct HubHandle {
    sender: mpsc::Sender<HubMessage>,
}

impl HubHandle {
    /// Create a new handle with the given sender.
    pub(crate) const fn new(sender: mpsc::Sender<HubMessage>) -> Self { Self { sender } }

    // ========================================================================
    // Fire-and-forget sending
    // ========================================================================

    /// Send a message to the actor without waiting for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed or full.
    pub fn send(&self, msg: HubMessage) -> Result<(), ActorError> {
        self.sender.try_send(msg).map_err(|_| ActorError::SendFailed)
    }

    /// Send a message to the actor and wait for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed.
    pub async fn send_async(&self, msg: HubMessage) -> Result<(), ActorError> {
        self.sender.send(msg).await.map_err(|_| ActorError::SendFailed)
    }

    /// Whether the hub has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.sender.is_closed() }

    // ========================================================================
    // Query methods
    // ========================================================================

    /// Execute a query and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the channel is closed, or
    /// [`ActorError::ReceiveFailed`] if the response channel is closed.
    pub async fn query(&self, query: HubQuery) -> Result<QueryResult, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(HubMessage::Query { query, respond_to: tx }).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Execute a query with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if the query doesn't complete in time,
    /// or any error from [`Self::query`].
    pub async fn query_timeout(&self, query: HubQuery, timeout: Duration) -> Result<QueryResult, ActorError> {
        tokio::time::timeout(timeout, self.query(query))
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }

    // ========================================================================
    // Convenience query methods
    // ========================================================================

    /// Get a snapshot of the whole board.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn board(&self) -> Result<BoardState, ActorError> {
        match self.query(HubQuery::GetBoard).await? {
            QueryResult::Board(board) => Ok(*board),
            _ => Err(ActorError::UnexpectedResult("GetBoard")),
        }
    }

    /// Get a single note.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn note(&self, id: impl Into<NoteId>) -> Result<Option<Note>, ActorError> {
        match self.query(HubQuery::GetNote { id: id.into() }).await? {
            QueryResult::Note(note) => Ok(note.map(|n| *n)),
            _ => Err(ActorError::UnexpectedResult("GetNote")),
        }
    }

    /// Get the handshake phase of a note window.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn window_phase(&self, id: impl Into<NoteId>) -> Result<WindowPhase, ActorError> {
        match self.query(HubQuery::GetWindowPhase { id: id.into() }).await? {
            QueryResult::WindowPhase(phase) => Ok(phase),
            _ => Err(ActorError::UnexpectedResult("GetWindowPhase")),
        }
    }

    /// Get connector paths, using the board's style unless one is given.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn connectors(
        &self,
        style: Option<ConnectStyle>,
        only_open: bool,
    ) -> Result<Vec<Connector>, ActorError> {
        match self.query(HubQuery::GetConnectors { style, only_open }).await? {
            QueryResult::Connectors(connectors) => Ok(connectors),
            _ => Err(ActorError::UnexpectedResult("GetConnectors")),
        }
    }

    /// Get the outcome of the last save.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn last_save(&self) -> Result<Option<SaveStatus>, ActorError> {
        match self.query(HubQuery::GetLastSave).await? {
            QueryResult::LastSave(status) => Ok(status),
            _ => Err(ActorError::UnexpectedResult("GetLastSave")),
        }
    }

    // ========================================================================
    // Convenience commands
    // ========================================================================

    /// Create a note and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn create_note(&self, overrides: RectOverrides) -> Result<NoteId, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(HubMessage::CreateNote { overrides, respond_to: Some(tx) }).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Open a note window and wait for the handshake to settle.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn open_note(&self, id: impl Into<NoteId>) -> Result<OpenOutcome, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(HubMessage::OpenNote { id: id.into(), respond_to: Some(tx) }).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Close a note window.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the hub has stopped.
    pub async fn close_note(&self, id: impl Into<NoteId>) -> Result<(), ActorError> {
        self.send_async(HubMessage::CloseNote { id: id.into() }).await
    }

    /// Save now and wait for the result.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the actor fails.
    pub async fn flush(&self) -> Result<SaveStatus, ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(HubMessage::Flush { respond_to: Some(tx) }).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }

    /// Stop the hub after a final save and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the hub has already stopped.
    pub async fn shutdown(&self) -> Result<(), ActorError> {
        let (tx, rx) = oneshot::channel();
        self.send_async(HubMessage::Shutdown { respond_to: Some(tx) }).await?;
        rx.await.map_err(|_| ActorError::ReceiveFailed)
    }
}
