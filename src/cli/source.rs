use crate::git::GitBackend;
use crate::service::ProfileService;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

/// `source add|list`
#[derive(Args)]
pub struct SourceCommand {
    #[command(subcommand)]
    command: SourceSubcommands,
}

#[derive(Subcommand)]
enum SourceSubcommands {
    /// Register a collection.
    ///
    /// The registry is append-only; an id can be registered once.
    Add {
        /// Collection id (letters, digits, '_' and '-')
        id: String,

        /// `git+<url>@<ref>[/<subpath>]`, `bundled:<path>`, or a filesystem path
        source_ref: String,
    },

    /// List registered collections
    List,
}

impl SourceCommand {
    /// Runs the `source` subcommand.
    pub fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        match self.command {
            SourceSubcommands::Add {
                id,
                source_ref,
            } => {
                let added = service.add_source(&id, &source_ref)?;
                println!("{} Registered {} -> {}", "✓".green(), added.id.bold(), added.raw_ref);
            }
            SourceSubcommands::List => {
                let registry = service.sources()?;
                if registry.list().is_empty() {
                    println!("No collections registered.");
                    println!("\n{}: amplifier-profiles source add <id> <source-ref>", "Tip".cyan());
                    return Ok(());
                }
                let width = registry.list().iter().map(|s| s.id.len()).max().unwrap_or(0);
                for source in registry.list() {
                    println!("{}  {}", format!("{:<width$}", source.id).bold(), source.raw_ref);
                }
            }
        }
        Ok(())
    }
}
