//! Feature modules for hinotes.
//!
//! - [`board`] - Board state, the hub actor, persistence and connector geometry
//! - [`bus`] - In-process message bus carrying the window protocol
//! - [`host`] - Window and storage capabilities, plus a headless host
//! - [`note_window`] - The note window's side of the sync protocol

pub mod board;
pub mod bus;
pub mod host;
pub mod note_window;
