//! hinotes - a board of notes rendered as native windows.
//!
//! A single hub owns the board and talks to every note window through a
//! message bus. Windows report what the user did; the hub decides, persists,
//! and broadcasts the overlay.

pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod modules;
pub mod schema;

use tracing_subscriber::EnvFilter;

pub use error::HinotesError;
pub use modules::board::{HubActor, HubHandle, HubMessage, HubOptions};
pub use modules::bus::{BusEvent, MessageBus};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "HINOTES_LOG";

/// Installs the global `tracing` subscriber.
///
/// Filter directives come from `HINOTES_LOG`, then `RUST_LOG`, defaulting to
/// `info`. Logs go to stderr so command output stays machine-readable.
/// Calling it twice is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
