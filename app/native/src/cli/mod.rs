//! CLI module for hinotes.
//!
//! The CLI inspects and edits the persisted layout, previews connector
//! geometry, and can run the whole hub against headless windows.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::HinotesError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), HinotesError> {
    let cli = Cli::parse();
    cli.execute()
}
