//! Command-line interface for the profile pipeline.
//!
//! ```bash
//! amplifier-profiles source add foundation git+https://github.com/example/profiles@main/foundation
//! amplifier-profiles discover
//! amplifier-profiles list foundation
//! amplifier-profiles show foundation dev --format json
//! amplifier-profiles compile foundation dev
//! amplifier-profiles activate foundation/dev --compile
//! amplifier-profiles active
//! ```
//!
//! Global flags:
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config <PATH>`: alternative config file (also `AMPLIFIER_CONFIG`)

mod activate;
mod discover;
mod profile;
mod source;

use crate::config::GlobalConfig;
use crate::service::ProfileService;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter; `RUST_LOG` takes precedence when set
    pub log_level: String,
    pub config_path: Option<PathBuf>,
}

#[derive(Parser)]
#[command(
    name = "amplifier-profiles",
    about = "Resolve, compile and activate Amplifier profiles",
    version,
    long_about = "Manages profile collections: discovers schema-v2 profile manifests, resolves \
                  single-level inheritance, compiles profiles into loadable module trees and \
                  tracks the active profile."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the config file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered collections
    Source(source::SourceCommand),

    /// Discover profiles of one or all collections
    Discover(discover::DiscoverCommand),

    /// List the cached profiles of a collection
    List(profile::ListCommand),

    /// Print a resolved profile
    Show(profile::ShowCommand),

    /// Compile a profile into its module tree
    Compile(profile::CompileCommand),

    /// Set the active profile
    Activate(activate::ActivateCommand),

    /// Print the active profile
    Active(activate::ActiveCommand),
}

impl Cli {
    /// Builds the [`CliConfig`] from the global flags.
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        };
        CliConfig {
            log_level: log_level.to_string(),
            config_path: self.config.clone(),
        }
    }

    /// Runs the selected command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Runs the selected command with an explicit logging and config setup.
    pub async fn execute_with_config(self, cli_config: CliConfig) -> Result<()> {
        let config = GlobalConfig::load(cli_config.config_path).await?;
        let service = ProfileService::from_config(config)?;

        match self.command {
            Commands::Source(cmd) => cmd.execute(&service),
            Commands::Discover(cmd) => cmd.execute(&service).await,
            Commands::List(cmd) => cmd.execute(&service),
            Commands::Show(cmd) => cmd.execute(&service).await,
            Commands::Compile(cmd) => cmd.execute(&service).await,
            Commands::Activate(cmd) => cmd.execute(&service).await,
            Commands::Active(cmd) => cmd.execute(&service),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels() {
        let cli = Cli::parse_from(["amplifier-profiles", "active"]);
        assert_eq!(cli.build_config().log_level, "info");

        let cli = Cli::parse_from(["amplifier-profiles", "-v", "active"]);
        assert_eq!(cli.build_config().log_level, "debug");

        let cli = Cli::parse_from(["amplifier-profiles", "active", "--quiet"]);
        assert_eq!(cli.build_config().log_level, "error");
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["amplifier-profiles", "-v", "-q", "active"]).is_err());
    }

    #[test]
    fn test_config_flag() {
        let cli = Cli::parse_from(["amplifier-profiles", "--config", "/tmp/c.toml", "active"]);
        assert_eq!(cli.build_config().config_path, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn test_show_format_values() {
        assert!(Cli::try_parse_from(["amplifier-profiles", "show", "c", "p", "--format", "json"]).is_ok());
        assert!(Cli::try_parse_from(["amplifier-profiles", "show", "c", "p", "--format", "xml"]).is_err());
    }
}
