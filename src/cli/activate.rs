use crate::git::GitBackend;
use crate::service::ProfileService;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

/// `activate COLLECTION/PROFILE [--compile]`
#[derive(Args)]
pub struct ActivateCommand {
    /// Collection-qualified profile name, e.g. `foundation/dev`
    #[arg(value_name = "COLLECTION/PROFILE")]
    qualified_name: String,

    /// Compile the profile before activating it
    #[arg(long)]
    compile: bool,
}

impl ActivateCommand {
    /// Records the profile as active, compiling it first with `--compile`.
    pub async fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        if let Some(path) = service.activate(&self.qualified_name, self.compile).await? {
            println!("{} Compiled {}", "✓".green(), path.display());
        }
        println!("{} Active profile: {}", "✓".green(), self.qualified_name.bold());
        Ok(())
    }
}

/// `active`
#[derive(Args)]
pub struct ActiveCommand {
    /// Clear the active profile instead of printing it
    #[arg(long)]
    clear: bool,
}

impl ActiveCommand {
    /// Prints or clears the active profile.
    pub fn execute<G: GitBackend>(self, service: &ProfileService<G>) -> Result<()> {
        if self.clear {
            service.deactivate()?;
            println!("{} Active profile cleared", "✓".green());
            return Ok(());
        }
        match service.active()? {
            Some(name) => println!("{name}"),
            None => println!("No active profile"),
        }
        Ok(())
    }
}
