//! CLI command definitions using Clap.
//!
//! - `layout` - Inspect, locate and reset the persisted layout
//! - `connectors` - Preview connector anchors and paths
//! - `simulate` - Run the hub against headless note windows
//! - `config_cmd` - Configuration file management

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Generator, Shell, generate};

use crate::error::HinotesError;
use crate::modules::board::persistence::JsonFileLayout;
use crate::modules::board::state::ConnectStyle;
use crate::{config, schema};

pub mod config_cmd;
pub mod layout;
pub mod simulate;

pub use config_cmd::ConfigCommands;
pub use layout::LayoutCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// hinotes CLI - a board of notes kept in sync across native windows.
#[derive(Parser, Debug)]
#[command(name = "hinotes")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Connector style accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliConnectStyle {
    Smooth,
    Orthogonal,
}

impl From<CliConnectStyle> for ConnectStyle {
    fn from(style: CliConnectStyle) -> Self {
        match style {
            CliConnectStyle::Smooth => Self::Smooth,
            CliConnectStyle::Orthogonal => Self::Orthogonal,
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Persisted layout commands.
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// Show connector anchors and SVG paths for every link.
    ///
    /// Links whose endpoints are not both existing notes are skipped.
    Connectors {
        /// Override the board's connector style.
        #[arg(long, short, value_enum)]
        style: Option<CliConnectStyle>,

        /// Only links between open notes, as the overlay draws them.
        #[arg(long)]
        open_only: bool,

        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Run the hub against headless note windows.
    ///
    /// Loads the layout into memory, opens every note in a virtual window,
    /// exercises the sync protocol, and reports what happened. The layout
    /// file is never written.
    Simulate(simulate::SimulateArgs),

    /// Configuration file management commands.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output the configuration JSON Schema.
    ///
    /// Can be redirected to a file for use with editors that support JSON
    /// Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Usage:
    ///   eval "$(hinotes completions --shell zsh)"
    ///   hinotes completions --shell fish > ~/.config/fish/completions/hinotes.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), HinotesError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(HinotesError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        match &self.command {
            Commands::Layout(cmd) => layout::execute(cmd),
            Commands::Connectors { style, open_only, json } => {
                layout::execute_connectors(style.map(ConnectStyle::from), *open_only, *json)
            }
            Commands::Simulate(args) => simulate::execute(args),
            Commands::Config(cmd) => config_cmd::execute(cmd),
            Commands::Schema => {
                println!("{}", schema::print_schema());
                Ok(())
            }
            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "hinotes", &mut io::stdout());
    }
}

/// The layout file used by the configured hub.
///
/// # Errors
///
/// Returns an error when no data directory is available and no path is
/// configured.
pub fn layout_store() -> Result<JsonFileLayout, HinotesError> {
    config::get_config()
        .persistence
        .layout_path()
        .map(JsonFileLayout::new)
        .ok_or_else(|| HinotesError::ConfigError("No data directory available for the layout file".into()))
}

/// Run a future to completion on a fresh current-thread runtime.
///
/// # Errors
///
/// Returns an error if the runtime cannot be created.
pub fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, HinotesError> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_schema() {
        let cli = Cli::try_parse_from(["hinotes", "schema"]).unwrap();
        assert!(matches!(cli.command, Commands::Schema));
    }

    #[test]
    fn test_cli_parses_completions() {
        let cli = Cli::try_parse_from(["hinotes", "completions", "--shell", "zsh"]).unwrap();
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Zsh),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_cli_parses_layout_show_json() {
        let cli = Cli::try_parse_from(["hinotes", "layout", "show", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Layout(LayoutCommands::Show { json: true })));
    }

    #[test]
    fn test_cli_parses_layout_reset() {
        let cli = Cli::try_parse_from(["hinotes", "layout", "reset", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Layout(LayoutCommands::Reset { force: true })));
    }

    #[test]
    fn test_cli_parses_connectors_style() {
        let cli = Cli::try_parse_from(["hinotes", "connectors", "--style", "orthogonal"]).unwrap();
        match cli.command {
            Commands::Connectors { style, open_only, json } => {
                assert_eq!(style, Some(CliConnectStyle::Orthogonal));
                assert!(!open_only);
                assert!(!json);
            }
            _ => panic!("Expected Connectors command"),
        }
    }

    #[test]
    fn test_cli_parses_simulate() {
        let cli =
            Cli::try_parse_from(["hinotes", "simulate", "--notes", "3", "--duration-ms", "500"]).unwrap();
        match cli.command {
            Commands::Simulate(args) => {
                assert_eq!(args.notes, 3);
                assert_eq!(args.duration_ms, 500);
                assert!(!args.silent);
            }
            _ => panic!("Expected Simulate command"),
        }
    }

    #[test]
    fn test_cli_parses_config_flag_anywhere() {
        let cli = Cli::try_parse_from(["hinotes", "schema", "--config", "/tmp/c.jsonc"]).unwrap();
        assert_eq!(cli.config_path(), Some(PathBuf::from("/tmp/c.jsonc")));
    }

    #[test]
    fn test_style_conversion() {
        assert_eq!(ConnectStyle::from(CliConnectStyle::Smooth), ConnectStyle::Smooth);
        assert_eq!(ConnectStyle::from(CliConnectStyle::Orthogonal), ConnectStyle::Orthogonal);
    }

    #[test]
    fn test_app_version_is_not_empty() {
        assert!(!APP_VERSION.is_empty());
    }
}
