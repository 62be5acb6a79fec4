//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// hinotes Configuration File
// ==========================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.
//
// Run `hinotes schema > hinotes.schema.json` for editor completion.

{
  // ============================================================================
  // Window Synchronization
  // ============================================================================
  // "sync": {
  //   // Wait this long for a spawned note window to report ready
  //   "handshakeTimeoutMs": 2000,
  //
  //   // Spawn retries after the first timeout
  //   "handshakeRetries": 1,
  //
  //   // Ignore OS position reports this long after the hub moves a window
  //   "echoBlockMs": 300,
  //
  //   // Swallow one OS resize report this long after a committed resize
  //   "resizeAckGraceMs": 300,
  //
  //   // Note window polling while moving / at rest
  //   "pollActiveMs": 100,
  //   "pollIdleMs": 450,
  //
  //   // Stay in fast polling this long after the last change
  //   "activeWindowMs": 1500,
  //
  //   // Debounce for title and content edits
  //   "contentDebounceMs": 500
  // },

  // ============================================================================
  // Layout Persistence
  // ============================================================================
  // "persistence": {
  //   // Delay between the last change and the write to disk
  //   "debounceMs": 250,
  //
  //   // Custom layout file (defaults to the platform data directory)
  //   "path": "~/Documents/hinotes/layout.json"
  // },

  // ============================================================================
  // Board
  // ============================================================================
  // "board": {
  //   "openNotesOnStart": true,
  //   "defaultNoteWidth": 300,
  //   "defaultNoteHeight": 200,
  //   "gridDensity": 40,
  //   "snapThreshold": 6
  // },

  // ============================================================================
  // External Windows
  // ============================================================================
  // "externals": {
  //   "enabled": false,
  //   "refreshIntervalMs": 2000
  // }
}
"#
    .to_string()
}

/// Writes the template to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directories or the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}
