//! The note-window half of the sync protocol.
//!
//! Each note window runs one [`NoteWindowSession`]: it announces itself with
//! `note:ready`, waits for the hub to hydrate it, debounces content edits,
//! and polls its own native frame so the hub learns about OS-driven moves
//! and resizes.

pub mod poller;
pub mod session;

pub use poller::{PollScheduler, RectChange, RectSampler};
pub use session::{NoteWindowSession, SessionHandle, SessionOptions};

use crate::modules::board::state::Rect;
use crate::modules::host::HostError;

/// Read access to the native window a session represents.
pub trait NativeWindow: Send + Sync + 'static {
    /// Current outer frame in logical board coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotFound`] once the window is gone.
    fn outer_rect(&self) -> Result<Rect, HostError>;
}
