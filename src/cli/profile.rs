use crate::discovery::Namespace;
use crate::git::GitBackend;
use crate::service::ProfileService;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

/// `list COLLECTION`
#[derive(Args)]
pub struct ListCommand {
    /// Collection id
    collection: String,
}

impl ListCommand {
    /// Prints cached profiles of a collection.
    pub fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        crate::source::validate_collection_id(&self.collection)?;
        let profiles = service.list_cached(&Namespace::Collection(self.collection.clone()))?;
        if profiles.is_empty() {
            println!("No cached profiles for '{}'.", self.collection);
            println!("\n{}: amplifier-profiles discover {}", "Tip".cyan(), self.collection);
            return Ok(());
        }

        for manifest in profiles {
            let extends = manifest
                .profile
                .extends
                .as_deref()
                .map(|parent| format!(" (extends {parent})"))
                .unwrap_or_default();
            println!(
                "{} {}{}  {}",
                manifest.name().bold(),
                format!("v{}", manifest.profile.version).dimmed(),
                extends,
                manifest.profile.description
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// `show COLLECTION PROFILE [--format yaml|json]`
#[derive(Args)]
pub struct ShowCommand {
    /// Collection id
    collection: String,

    /// Profile name
    profile: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "yaml")]
    format: OutputFormat,
}

impl ShowCommand {
    /// Prints the resolved profile.
    pub async fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        let resolved = service.load(&self.collection, &self.profile).await?;
        let rendered = match self.format {
            OutputFormat::Yaml => serde_yaml::to_string(&resolved).context("Failed to render profile as YAML")?,
            OutputFormat::Json => {
                serde_json::to_string_pretty(&resolved).context("Failed to render profile as JSON")?
            }
        };
        println!("{}", rendered.trim_end());
        Ok(())
    }
}

/// `compile COLLECTION PROFILE`
#[derive(Args)]
pub struct CompileCommand {
    /// Collection id
    collection: String,

    /// Profile name
    profile: String,
}

impl CompileCommand {
    /// Compiles the profile and prints the output directory.
    pub async fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        let compiled = service.compile(&self.collection, &self.profile).await?;
        println!(
            "{} Compiled {}/{} -> {}",
            "✓".green(),
            self.collection,
            self.profile.bold(),
            compiled.display()
        );
        Ok(())
    }
}
