//! Configuration for hinotes.
//!
//! The file is JSONC and read once per process. A missing or broken file
//! falls back to defaults with a log line; nothing here fails the caller.

pub mod template;
pub mod types;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use types::{
    BoardConfig, ConfigError, ExternalsConfig, HinotesConfig, LAYOUT_FILE_NAME,
    PersistenceConfig, SyncConfig, config_paths, load_config as load_config_default,
    load_config_from_path,
};

static CONFIG: OnceLock<HinotesConfig> = OnceLock::new();

static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Set by `--config`.
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Read the configuration from `path` instead of searching.
///
/// Only effective before the first [`get_config`]. Returns `false` when an
/// override was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

fn load_or_default() -> HinotesConfig {
    let result = CUSTOM_CONFIG_PATH
        .get()
        .map_or_else(load_config_default, |path| load_config_from_path(path));

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "loaded configuration");
            let _ = CONFIG_PATH.set(path);
            config
        }
        Err(ConfigError::NotFound) => {
            tracing::debug!("no configuration file found, using defaults");
            HinotesConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            HinotesConfig::default()
        }
    }
}

/// The process-wide configuration, loaded on first use.
pub fn get_config() -> &'static HinotesConfig { CONFIG.get_or_init(load_or_default) }

/// The file the configuration was read from; `None` when running on defaults.
pub fn get_config_path() -> Option<&'static PathBuf> { CONFIG_PATH.get() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sections_are_available() {
        let config = HinotesConfig::default();
        assert!(config.board.open_notes_on_start);
        assert!(!config.externals.is_enabled());
        assert_eq!(config.persistence.debounce_ms, 250);
    }

    #[test]
    fn test_get_config_is_stable() {
        let first = get_config() as *const HinotesConfig;
        let second = get_config() as *const HinotesConfig;
        assert_eq!(first, second);
    }
}
