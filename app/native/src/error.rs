//! Error types for hinotes.
//!
//! This module provides the unified error type used at the API and CLI
//! boundary. Layer-specific errors (configuration, actor, host) convert into
//! it so callers only need to handle one type.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::modules::board::actor::ActorError;
use crate::modules::host::HostError;

/// Errors that can occur during application execution.
///
/// This enum implements `Serialize` so it can cross a process boundary as a
/// structured `{ kind, message }` object.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum HinotesError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Layout could not be saved or loaded.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// A window capability call failed.
    #[error("Host error: {0}")]
    HostError(String),
    /// Communication with the hub actor failed.
    #[error("Hub error: {0}")]
    HubError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for HinotesError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for HinotesError {
    fn from(err: serde_json::Error) -> Self { Self::PersistenceError(err.to_string()) }
}

impl From<ConfigError> for HinotesError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ActorError> for HinotesError {
    fn from(err: ActorError) -> Self { Self::HubError(err.to_string()) }
}

impl From<HostError> for HinotesError {
    fn from(err: HostError) -> Self { Self::HostError(err.to_string()) }
}

impl From<String> for HinotesError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for HinotesError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}
