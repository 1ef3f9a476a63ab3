//! Git operations backing the reference resolver.
//!
//! All git work goes through the system `git` executable via [`GitCommand`], which
//! keeps behavior identical to what users see on the command line (credential
//! helpers, SSH config, proxies).
//!
//! # Components
//!
//! - [`GitBackend`] - the two operations the resolver needs: turn a ref into a commit,
//!   and materialize a repository at a commit
//! - [`SystemGit`] - the production backend over the `git` CLI
//! - [`is_git_installed`] - prerequisite check; a missing executable surfaces as
//!   [`ProfileError::GitNotFound`] from the first command
//!
//! The backend is a trait so that tests can substitute an in-process fake and count
//! how many clones the cache actually performs.

pub mod command_builder;

use crate::core::ProfileError;
use crate::git::command_builder::GitCommand;
use anyhow::Result;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// Returns the platform-specific git executable name.
pub const fn get_git_command() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Returns true when `reference` is a full 40 character hex commit id.
pub fn is_commit_hash(reference: &str) -> bool {
    reference.len() == 40 && reference.chars().all(|c| c.is_ascii_hexdigit())
}

/// Remote git operations required by reference resolution.
pub trait GitBackend: Send + Sync {
    /// Resolves a branch, tag, or commit on `url` to a full commit hash.
    fn resolve_commit(&self, url: &str, reference: &str) -> impl Future<Output = Result<String>> + Send;

    /// Clones `url` into `target` (which must not exist) and checks out `commit`.
    fn clone_at_commit(
        &self,
        url: &str,
        commit: &str,
        target: &Path,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// [`GitBackend`] implemented with the system git executable.
#[derive(Debug, Clone)]
pub struct SystemGit {
    timeout: Option<Duration>,
}

impl Default for SystemGit {
    fn default() -> Self {
        Self {
            timeout: Some(crate::constants::DEFAULT_GIT_TIMEOUT),
        }
    }
}

impl SystemGit {
    /// Creates a backend whose commands are bounded by `timeout` (`None` = unbounded).
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
        }
    }
}

impl GitBackend for SystemGit {
    async fn resolve_commit(&self, url: &str, reference: &str) -> Result<String> {
        if is_commit_hash(reference) {
            return Ok(reference.to_ascii_lowercase());
        }

        let listing = GitCommand::ls_remote(url, reference)
            .timeout(self.timeout)
            .with_context(reference)
            .execute_stdout()
            .await?;

        select_ls_remote_commit(&listing, reference).ok_or_else(|| {
            ProfileError::ref_resolution(
                format!("{url}@{reference}"),
                format!("no branch or tag named '{reference}' exists on the remote"),
            )
            .into()
        })
    }

    async fn clone_at_commit(&self, url: &str, commit: &str, target: &Path) -> Result<()> {
        GitCommand::clone(url, target).timeout(self.timeout).with_context(commit).execute_success().await?;

        GitCommand::checkout_detached(commit)
            .current_dir(target)
            .timeout(self.timeout)
            .with_context(commit)
            .execute_success()
            .await?;

        tracing::debug!(target: "git", "Checked out {} at {}", url, &commit[..commit.len().min(8)]);
        Ok(())
    }
}

/// Picks the commit for `reference` out of `git ls-remote` output.
///
/// Only exact names count, in order: branch, peeled annotated tag, lightweight tag.
/// `ls-remote` also matches by suffix (`feature/main` for `main`); such refs are ignored.
fn select_ls_remote_commit(listing: &str, reference: &str) -> Option<String> {
    let entries: Vec<(&str, &str)> = listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            Some((parts.next()?, parts.next()?))
        })
        .collect();

    let candidates = [
        format!("refs/heads/{reference}"),
        format!("refs/tags/{reference}^{{}}"),
        format!("refs/tags/{reference}"),
    ];

    candidates
        .iter()
        .find_map(|wanted| entries.iter().find(|(_, name)| name == wanted))
        .map(|(sha, _)| (*sha).to_string())
}

/// Checks whether git is installed and runnable.
#[must_use]
pub fn is_git_installed() -> bool {
    std::process::Command::new(get_git_command())
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}
