use crate::git::GitBackend;
use crate::service::ProfileService;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// `discover [COLLECTION]`
#[derive(Args)]
pub struct DiscoverCommand {
    /// Collection to discover; all registered collections when omitted
    collection: Option<String>,
}

impl DiscoverCommand {
    /// Refreshes the manifest cache and prints what was accepted.
    pub async fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        let discovered = match self.collection {
            Some(id) => {
                let profiles = service.discover_collection(&id).await?;
                vec![(id, profiles)]
            }
            None => service.discover_all().await?.into_iter().collect(),
        };

        for (id, profiles) in discovered {
            println!("{} {} ({} profile(s))", "✓".green(), id.bold(), profiles.len());
            for profile in profiles {
                println!("    {} {}", profile.name(), format!("v{}", profile.profile.version).dimmed());
            }
        }
        Ok(())
    }
}
