//! Reference resolution: turn a reference string into a local path.
//!
//! Three forms are dispatched by prefix (see [`SourceRef`]):
//!
//! - **git** (`git+<url>@<ref>[/<subpath>]`): the ref is resolved to a commit and the
//!   commit-keyed [`GitCache`] is consulted before any clone
//! - **bundled** (`bundled:<path>`): looked up under the configured bundled data root
//! - **filesystem**: absolute paths are checked for existence; relative paths need a
//!   base directory ([`RefResolver::resolve_with_base`])
//!
//! Every failure surfaces as [`ProfileError::RefResolution`] carrying the reference
//! string exactly as it was given.

use crate::cache::GitCache;
use crate::core::ProfileError;
use crate::git::GitBackend;
use crate::source::SourceRef;
use crate::utils::validate_no_traversal;
use anyhow::{Result, anyhow};
use std::path::{Path, PathBuf};

/// Resolves reference strings to local filesystem paths.
#[derive(Debug)]
pub struct RefResolver<G> {
    git_cache: GitCache<G>,
    bundled_dir: Option<PathBuf>,
}

impl<G: GitBackend> RefResolver<G> {
    /// Creates a resolver. Without `bundled_dir`, bundled references fail to resolve.
    pub fn new(git_cache: GitCache<G>, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            git_cache,
            bundled_dir,
        }
    }

    /// Resolves `reference`. Relative filesystem paths are rejected.
    pub async fn resolve(&self, reference: &str) -> Result<PathBuf> {
        self.resolve_with_base(reference, None).await
    }

    /// Resolves `reference`, joining relative filesystem paths onto `base`.
    pub async fn resolve_with_base(&self, reference: &str, base: Option<&Path>) -> Result<PathBuf> {
        match self.resolve_inner(reference, base).await {
            Ok(path) => {
                tracing::debug!("Resolved '{}' -> {}", reference, path.display());
                Ok(path)
            }
            Err(e) => {
                let reason = match e.downcast_ref::<ProfileError>() {
                    Some(ProfileError::RefResolution {
                        reason,
                        ..
                    }) => reason.clone(),
                    _ => format!("{e:#}"),
                };
                Err(ProfileError::ref_resolution(reference, reason).into())
            }
        }
    }

    async fn resolve_inner(&self, reference: &str, base: Option<&Path>) -> Result<PathBuf> {
        match reference.parse::<SourceRef>()? {
            SourceRef::Git {
                url,
                reference: git_ref,
                subpath,
            } => {
                let root = self.git_cache.checkout(&url, &git_ref).await?;
                match subpath {
                    None => Ok(root),
                    Some(sub) => {
                        validate_no_traversal(&sub)?;
                        let joined = root.join(&sub);
                        if joined.exists() {
                            Ok(joined)
                        } else {
                            Err(anyhow!("subpath '{}' does not exist in {}@{}", sub.display(), url, git_ref))
                        }
                    }
                }
            }
            SourceRef::Bundled(resource) => self.resolve_bundled(&resource),
            SourceRef::Filesystem(path) => {
                let path = if path.is_absolute() {
                    path
                } else if let Some(base) = base {
                    base.join(path)
                } else {
                    return Err(anyhow!(
                        "relative paths are not supported here; resolve against a base directory first"
                    ));
                };
                if path.exists() {
                    Ok(path)
                } else {
                    Err(anyhow!("path {} does not exist", path.display()))
                }
            }
        }
    }

    /// Dotted paths without a slash map dots to directory separators; slash paths
    /// are used verbatim. A dotted path whose mapped form is missing falls back to
    /// the verbatim spelling so file names with extensions still resolve.
    fn resolve_bundled(&self, resource: &str) -> Result<PathBuf> {
        let root =
            self.bundled_dir.as_ref().ok_or_else(|| anyhow!("no bundled data directory is configured"))?;

        if resource.contains("..") {
            return Err(anyhow!("bundled resource paths must not contain '..'"));
        }

        let verbatim = PathBuf::from(resource);
        validate_no_traversal(&verbatim)?;

        let mut candidates = Vec::with_capacity(2);
        if !resource.contains('/') && resource.contains('.') {
            candidates.push(root.join(resource.replace('.', "/")));
        }
        candidates.push(root.join(&verbatim));

        candidates
            .into_iter()
            .find(|candidate| candidate.exists())
            .ok_or_else(|| anyhow!("bundled resource '{resource}' does not exist under {}", root.display()))
    }
}
