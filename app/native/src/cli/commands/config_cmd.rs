//! Config CLI commands.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use colored::Colorize;

use crate::cli::output;
use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{self, config_paths};
use crate::error::HinotesError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Write a configuration file with every option documented.
    ///
    /// All options are commented out, so the file starts out equivalent to
    /// the defaults.
    #[command(
        name = "init",
        after_long_help = r"Examples:
  hinotes config init                          # Create config at default location
  hinotes config init --force                  # Overwrite existing config
  hinotes config init --path ~/notes.jsonc     # Create at custom path
  hinotes config init --stdout                 # Print template to stdout"
    )]
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        /// Defaults to ~/.config/hinotes/config.jsonc
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the template to stdout instead of writing a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show where hinotes looks for its configuration file.
    Path,

    /// Print the effective configuration, defaults included.
    Show,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cmd: &ConfigCommands) -> Result<(), HinotesError> {
    match cmd {
        ConfigCommands::Init { stdout: true, .. } => {
            println!("{}", generate_config_template());
            Ok(())
        }
        ConfigCommands::Init { force, path, stdout: false } => {
            let target = path.clone().unwrap_or_else(default_config_path);
            init_config(&target, *force)
        }
        ConfigCommands::Path => {
            show_config_paths();
            Ok(())
        }
        ConfigCommands::Show => {
            let value = serde_json::to_value(config::get_config())?;
            if let Some(path) = config::get_config_path() {
                println!("{}", format!("# {}", path.display()).dimmed());
            }
            output::print_highlighted_json(&value);
            Ok(())
        }
    }
}

fn default_config_path() -> PathBuf {
    config_paths().into_iter().next().unwrap_or_else(|| PathBuf::from("config.jsonc"))
}

fn init_config(path: &Path, force: bool) -> Result<(), HinotesError> {
    if path.exists() && !force {
        return Err(HinotesError::ConfigError(format!(
            "Configuration file already exists at: {}\nUse --force to overwrite.",
            path.display()
        )));
    }

    create_config_file(path).map_err(|e| {
        HinotesError::ConfigError(format!("Failed to create config file {}: {e}", path.display()))
    })?;

    println!("Configuration file created at: {}", path.display());
    println!("\nAll options are commented out by default.");
    Ok(())
}

fn show_config_paths() {
    println!("Configuration file search paths (in priority order):\n");

    let mut found = false;
    for (i, path) in config_paths().iter().enumerate() {
        let marker = match (path.exists(), found) {
            (true, false) => {
                found = true;
                " (active)".green().to_string()
            }
            (true, true) => " (exists)".to_string(),
            _ => String::new(),
        };
        println!("  {}. {}{marker}", i + 1, path.display());
    }

    if !found {
        println!("\nNo configuration file found.");
        println!("Run 'hinotes config init' to create one.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_is_jsonc() {
        let path = default_config_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jsonc"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");

        init_config(&path, false).unwrap();
        assert!(path.exists());

        let err = init_config(&path, false).unwrap_err();
        assert!(matches!(err, HinotesError::ConfigError(_)));
        init_config(&path, true).unwrap();
    }

    #[test]
    fn test_written_template_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.jsonc");
        init_config(&path, false).unwrap();

        let (loaded, _) = config::load_config_from_path(&path).unwrap();
        assert_eq!(loaded.sync, config::SyncConfig::default());
    }
}
