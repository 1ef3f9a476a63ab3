//! Commit-keyed cache of git checkouts
//!
//! Every git reference is resolved to a full commit hash before the cache is
//! consulted, so moving branches never serve stale content while identical
//! commits reached through different refs share one checkout.
//!
//! # Cache Directory Structure
//!
//! ```text
//! <home>/cache/git/
//! ├── profiles-1a2b3c4d/                         # <repo-name>-<url-hash>
//! │   ├── 4f9e...c21a/                           # full commit hash
//! │   └── .tmp-4f9e0c1d-<uuid>/                  # clone in progress
//! └── tools-9f8e7d6c/
//!     └── 77aa...0b3e/
//! ```
//!
//! # Concurrency
//!
//! A commit directory is only ever created by renaming a fully checked-out
//! temporary sibling into place, so readers never observe a partial clone. Two
//! processes racing on the same commit both clone; the rename of the loser fails
//! because the target exists, and the loser discards its copy and uses the
//! winner's. The cost of a lost race is redundant work, never corruption.

use crate::git::GitBackend;
use crate::utils::fs::{StagingDir, ensure_dir};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Git checkout cache keyed by repository and commit.
#[derive(Debug)]
pub struct GitCache<G> {
    dir: PathBuf,
    backend: G,
}

impl<G: GitBackend> GitCache<G> {
    /// Creates a cache rooted at `dir` using `backend` for remote operations.
    pub fn new(dir: PathBuf, backend: G) -> Self {
        Self {
            dir,
            backend,
        }
    }

    /// Directory holding the checkout of `url` at `commit`.
    pub fn commit_path(&self, url: &str, commit: &str) -> PathBuf {
        self.dir.join(repo_slug(url)).join(commit)
    }

    /// Returns a checkout of `url` at `reference`, cloning only when the resolved
    /// commit is not cached yet.
    pub async fn checkout(&self, url: &str, reference: &str) -> Result<PathBuf> {
        let commit = self.backend.resolve_commit(url, reference).await?;
        let target = self.commit_path(url, &commit);

        if target.is_dir() {
            tracing::debug!("Reusing cached checkout {} for {}@{}", target.display(), url, reference);
            return Ok(target);
        }

        let parent = target.parent().map(Path::to_path_buf).unwrap_or_else(|| self.dir.clone());
        ensure_dir(&parent)?;

        let short = &commit[..commit.len().min(8)];
        // Removed on drop, including when the caller stops polling mid-clone
        let staging = StagingDir::guard(parent.join(format!(".tmp-{short}-{}", uuid::Uuid::new_v4().simple())));

        tracing::info!("Cloning {} at {} ({})", url, reference, short);
        self.backend.clone_at_commit(url, &commit, staging.path()).await?;

        match std::fs::rename(staging.path(), &target) {
            Ok(()) => {
                staging.disarm();
                tracing::debug!("Cached {}@{} at {}", url, short, target.display());
                Ok(target)
            }
            Err(_) if target.is_dir() => {
                tracing::debug!("Lost clone race for {}@{}, using existing checkout", url, short);
                Ok(target)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to move clone into cache at {}", target.display())),
        }
    }
}

/// Stable directory name for a repository URL: `<repo-name>-<hash8>`.
///
/// The readable prefix is the last path segment without `.git`; the hash keeps
/// different hosts or owners with the same repository name apart.
pub fn repo_slug(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':', '\\']).next().unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);
    let name: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let name = if name.is_empty() { "repo".to_string() } else { name };

    let digest = Sha256::digest(url.as_bytes());
    format!("{name}-{}", &hex::encode(digest)[..8])
}
