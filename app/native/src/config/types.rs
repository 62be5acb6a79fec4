//! Configuration types for hinotes.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.
//! Every field is optional; missing values fall back to the defaults below.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Timing for the cross-window synchronization protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// How long the hub waits for `note:ready` after a spawn before retrying.
    /// Default: 2000
    pub handshake_timeout_ms: u64,

    /// Number of spawn retries after the first handshake timeout.
    /// Default: 1
    pub handshake_retries: u32,

    /// Quiet period after a hub-originated rect change during which OS
    /// position reports for the same note are discarded.
    /// Default: 300
    pub echo_block_ms: u64,

    /// How long one OS resize report is swallowed after a committed resize.
    /// Default: 300
    pub resize_ack_grace_ms: u64,

    /// Note-window polling interval while the window is moving.
    /// Default: 100
    pub poll_active_ms: u64,

    /// Note-window polling interval while the window is at rest.
    /// Default: 450
    pub poll_idle_ms: u64,

    /// How long after the last observed change polling stays fast.
    /// Default: 1500
    pub active_window_ms: u64,

    /// Debounce for title/content edits inside a note window.
    /// Default: 500
    pub content_debounce_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: 2000,
            handshake_retries: 1,
            echo_block_ms: 300,
            resize_ack_grace_ms: 300,
            poll_active_ms: 100,
            poll_idle_ms: 450,
            active_window_ms: 1500,
            content_debounce_ms: 500,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    #[must_use]
    pub const fn echo_block(&self) -> Duration { Duration::from_millis(self.echo_block_ms) }

    #[must_use]
    pub const fn resize_ack_grace(&self) -> Duration {
        Duration::from_millis(self.resize_ack_grace_ms)
    }

    #[must_use]
    pub const fn content_debounce(&self) -> Duration {
        Duration::from_millis(self.content_debounce_ms)
    }

    /// Total spawn attempts per open request.
    #[must_use]
    pub const fn max_spawn_attempts(&self) -> u32 { self.handshake_retries.saturating_add(1) }
}

/// Layout persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistenceConfig {
    /// Delay between the last mutation and the layout write.
    /// Default: 250
    pub debounce_ms: u64,

    /// Custom layout file location. Supports `~` expansion.
    /// Default: `<data dir>/hinotes/layout.json`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Default for PersistenceConfig {
    fn default() -> Self { Self { debounce_ms: 250, path: None } }
}

impl PersistenceConfig {
    #[must_use]
    pub const fn debounce(&self) -> Duration { Duration::from_millis(self.debounce_ms) }

    /// Resolves the layout file path, expanding `~` in a configured path.
    #[must_use]
    pub fn layout_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            return Some(PathBuf::from(shellexpand::tilde(path).as_ref()));
        }

        dirs::data_dir().map(|dir| dir.join("hinotes").join(LAYOUT_FILE_NAME))
    }
}

/// File name of the persisted layout document.
pub const LAYOUT_FILE_NAME: &str = "layout.json";

/// Board behaviour settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct BoardConfig {
    /// Open a window for every note after loading the layout.
    /// Default: true
    pub open_notes_on_start: bool,

    /// Width of newly created notes.
    /// Default: 300
    pub default_note_width: f64,

    /// Height of newly created notes.
    /// Default: 200
    pub default_note_height: f64,

    /// Grid density used when the layout has none.
    /// Default: 40
    pub grid_density: f64,

    /// Distance in pixels within which a dragged edge snaps to the grid.
    /// Default: 6
    pub snap_threshold: f64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            open_notes_on_start: true,
            default_note_width: 300.0,
            default_note_height: 200.0,
            grid_density: 40.0,
            snap_threshold: 6.0,
        }
    }
}

/// External (non-owned) window tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalsConfig {
    /// Enable surfacing foreign OS windows on the board.
    /// Default: false
    pub enabled: bool,

    /// How often the hub re-enumerates OS windows.
    /// Default: 2000
    pub refresh_interval_ms: u64,
}

impl Default for ExternalsConfig {
    fn default() -> Self { Self { enabled: false, refresh_interval_ms: 2000 } }
}

impl ExternalsConfig {
    #[must_use]
    pub const fn is_enabled(&self) -> bool { self.enabled }

    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct HinotesConfig {
    /// JSON Schema reference for editor support.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Cross-window synchronization timing.
    pub sync: SyncConfig,

    /// Layout persistence.
    pub persistence: PersistenceConfig,

    /// Board behaviour.
    pub board: BoardConfig,

    /// External window tracking.
    pub externals: ExternalsConfig,
}

/// Errors that can occur while loading the configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    NotFound,
    /// The configuration file exists but could not be read.
    IoError(std::io::Error),
    /// The configuration file contains invalid JSON.
    ParseError(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(
                f,
                "No configuration file found. Expected at $XDG_CONFIG_HOME/hinotes/config.jsonc or ~/.hinotes.jsonc"
            ),
            Self::IoError(err) => write!(f, "Failed to read configuration file: {err}"),
            Self::ParseError(err) => write!(f, "Failed to parse configuration file: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::ParseError(err) => Some(err),
            Self::NotFound => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err) }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self { Self::ParseError(err) }
}

const CONFIG_FILE_NAMES: [&str; 2] = ["config.jsonc", "config.json"];
const LEGACY_CONFIG_FILE_NAMES: [&str; 2] = [".hinotes.jsonc", ".hinotes.json"];

/// Returns the candidate configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/hinotes/config.jsonc` (when the variable is set)
/// 2. `~/.config/hinotes/config.jsonc`
/// 3. The platform config dir (`dirs::config_dir()`)
/// 4. `~/.hinotes.jsonc`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let push_dir = |dir: PathBuf, paths: &mut Vec<PathBuf>| {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(PathBuf::from(xdg_config).join("hinotes"), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(home.join(".config").join("hinotes"), &mut paths);
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(config_dir.join("hinotes"), &mut paths);
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if the file does not exist, or an IO or
/// parse error if it cannot be read.
pub fn load_config_from_path(path: &Path) -> Result<(HinotesConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: HinotesConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}

/// Loads the configuration from the first existing default location.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] when no candidate file exists.
pub fn load_config() -> Result<(HinotesConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}
