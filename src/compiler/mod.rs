//! Profile compilation: materialize every reference of a resolved profile.
//!
//! The compiled tree is a data contract for the runtime's module loader:
//!
//! ```text
//! <compiled-root>/<collection-id>/<profile-name>/
//! ├── __init__.py
//! ├── profile.json
//! ├── orchestrator/...
//! ├── context_manager/...
//! ├── contexts/<context-key>/...
//! ├── agents/<agent-name>.<ext>
//! ├── tools/<module-name>/...
//! ├── hooks/<module-name>/...
//! └── providers/<module-name>/...
//! ```
//!
//! Assets are stored under their logical names, not their source basenames.
//! Modules without a `source` are provided by the runtime and are skipped.
//!
//! # Atomicity
//!
//! Everything is built in a uniquely named staging sibling
//! (`.staging-<name>-<uuid>`) and renamed into place only after every reference
//! resolved and copied. The first failure aborts compilation, deletes the staging
//! directory, and leaves any previous compilation untouched.
//!
//! Concurrent compilations of the same profile are not serialized: each builds
//! its own staging tree and the last rename wins.

use crate::constants::{DEFAULT_AGENT_EXTENSION, PACKAGE_MARKER, RESOLVED_PROFILE_FILE, layout};
use crate::core::ProfileError;
use crate::git::GitBackend;
use crate::profile::ResolvedProfile;
use crate::resolver::RefResolver;
use crate::source::validate_collection_id;
use crate::utils::fs::{StagingDir, atomic_write, copy_path, ensure_dir};
use crate::utils::validate_logical_name;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What kind of logical asset a reference belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetKind {
    /// A single-module category (`orchestrator/`, `context_manager/`)
    SessionModule,
    /// `<category>/<module>/`
    Module,
    /// `agents/<name>.<ext>`
    Agent,
    /// `contexts/<key>/`
    Context,
}

/// One reference to materialize.
#[derive(Debug, Clone)]
struct Asset {
    kind: AssetKind,
    category: &'static str,
    name: String,
    reference: String,
}

impl Asset {
    fn describe(&self) -> String {
        match self.kind {
            AssetKind::SessionModule => format!("{} module '{}'", self.category.replace('_', "-"), self.name),
            AssetKind::Module => {
                let singular = self.category.strip_suffix('s').unwrap_or(self.category);
                format!("{singular} '{}'", self.name)
            }
            AssetKind::Agent => format!("agent '{}'", self.name),
            AssetKind::Context => format!("context '{}'", self.name),
        }
    }

    /// Destination inside the staging root for a resolved `source` path.
    fn destination(&self, staging: &Path, source: &Path) -> PathBuf {
        let category_dir = staging.join(self.category);
        let file_name = source.file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(&self.name));
        match self.kind {
            AssetKind::SessionModule if source.is_dir() => category_dir,
            AssetKind::SessionModule => category_dir.join(file_name),
            AssetKind::Agent if source.is_dir() => category_dir.join(&self.name),
            AssetKind::Agent => {
                let ext = source.extension().and_then(|e| e.to_str()).unwrap_or(DEFAULT_AGENT_EXTENSION);
                category_dir.join(format!("{}.{ext}", self.name))
            }
            AssetKind::Module | AssetKind::Context if source.is_dir() => category_dir.join(&self.name),
            AssetKind::Module | AssetKind::Context => category_dir.join(&self.name).join(file_name),
        }
    }
}

/// Compiles resolved profiles into the compiled tree.
#[derive(Debug)]
pub struct ProfileCompiler<G> {
    resolver: Arc<RefResolver<G>>,
    compiled_root: PathBuf,
}

impl<G: GitBackend> ProfileCompiler<G> {
    /// Creates a compiler writing below `compiled_root`.
    pub fn new(resolver: Arc<RefResolver<G>>, compiled_root: PathBuf) -> Self {
        Self {
            resolver,
            compiled_root,
        }
    }

    /// Final location of a compiled profile.
    pub fn compiled_path(&self, collection_id: &str, profile_name: &str) -> PathBuf {
        self.compiled_root.join(collection_id).join(profile_name)
    }

    /// Compiles `profile` for `collection_id` and returns the compiled directory.
    ///
    /// Relative filesystem references are resolved against `base_dir` (normally
    /// the collection root) when given.
    ///
    /// # Errors
    ///
    /// [`ProfileError::ProfileCompilation`] naming the logical asset whose reference
    /// failed, wrapping the underlying [`ProfileError::RefResolution`].
    pub async fn compile(
        &self,
        collection_id: &str,
        profile: &ResolvedProfile,
        base_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        validate_collection_id(collection_id)?;
        validate_logical_name(&profile.name)?;

        let assets = plan_assets(profile).map_err(|(asset, e)| compilation_error(profile, &asset, e))?;

        let target = self.compiled_path(collection_id, &profile.name);
        let parent = self.compiled_root.join(collection_id);
        ensure_dir(&parent)?;
        let staging = Arc::new(StagingDir::create(
            parent.join(format!(".staging-{}-{}", profile.name, uuid::Uuid::new_v4().simple())),
        )?);

        tracing::info!("Compiling {}/{} ({} reference(s))", collection_id, profile.name, assets.len());

        // Dropping the guard on any early return or cancellation removes the staging tree
        self.build(&staging, profile, &assets, base_dir).await?;
        swap_into_place(staging.path(), &target).await?;
        staging.disarm();

        tracing::info!("Compiled {}/{} -> {}", collection_id, profile.name, target.display());
        Ok(target)
    }

    async fn build(
        &self,
        staging: &Arc<StagingDir>,
        profile: &ResolvedProfile,
        assets: &[Asset],
        base_dir: Option<&Path>,
    ) -> Result<()> {
        for asset in assets {
            let source = self
                .resolver
                .resolve_with_base(&asset.reference, base_dir)
                .await
                .map_err(|e| compilation_error(profile, asset, ProfileError::from_anyhow(e)))?;

            let destination = asset.destination(staging.path(), &source);
            tracing::debug!("Copying {} from {} to {}", asset.describe(), source.display(), destination.display());

            // The task keeps the staging guard alive until the copy finishes
            let guard = Arc::clone(staging);
            let copy = tokio::task::spawn_blocking(move || {
                let copied = copy_path(&source, &destination);
                drop(guard);
                copied
            });
            copy.await.context("Copy task panicked").and_then(|copied| copied).map_err(|e| {
                compilation_error(
                    profile,
                    asset,
                    ProfileError::Other {
                        message: format!("{e:#}"),
                    },
                )
            })?;
        }

        write_markers(staging.path())?;

        let json = serde_json::to_vec_pretty(profile).context("Failed to serialize resolved profile")?;
        atomic_write(&staging.path().join(RESOLVED_PROFILE_FILE), &json)?;
        Ok(())
    }
}

fn compilation_error(profile: &ResolvedProfile, asset: &Asset, source: ProfileError) -> anyhow::Error {
    ProfileError::ProfileCompilation {
        profile: profile.name.clone(),
        asset: asset.describe(),
        source: Box::new(source),
    }
    .into()
}

/// Lists every reference in compiled-layout order.
fn plan_assets(profile: &ResolvedProfile) -> std::result::Result<Vec<Asset>, (Asset, ProfileError)> {
    let mut assets = Vec::new();

    for (category, module) in profile.modules() {
        let Some(ref source) = module.source else {
            tracing::debug!("Module '{}' has no source; the runtime provides it", module.module);
            continue;
        };
        let kind = if category == layout::ORCHESTRATOR || category == layout::CONTEXT_MANAGER {
            AssetKind::SessionModule
        } else {
            AssetKind::Module
        };
        assets.push(Asset {
            kind,
            category,
            name: module.module.clone(),
            reference: source.clone(),
        });
    }

    for (name, reference) in &profile.agents {
        assets.push(Asset {
            kind: AssetKind::Agent,
            category: layout::AGENTS,
            name: name.clone(),
            reference: reference.clone(),
        });
    }

    for (key, reference) in &profile.context {
        assets.push(Asset {
            kind: AssetKind::Context,
            category: layout::CONTEXTS,
            name: key.clone(),
            reference: reference.clone(),
        });
    }

    for asset in assets.iter().filter(|a| a.kind != AssetKind::SessionModule) {
        if let Err(e) = validate_logical_name(&asset.name) {
            return Err((
                asset.clone(),
                ProfileError::Other {
                    message: format!("{e:#}"),
                },
            ));
        }
    }

    Ok(assets)
}

/// Writes the package marker at the root and in each non-empty category.
fn write_markers(staging: &Path) -> Result<()> {
    atomic_write(&staging.join(PACKAGE_MARKER), b"")?;

    for category in [
        layout::ORCHESTRATOR,
        layout::CONTEXT_MANAGER,
        layout::CONTEXTS,
        layout::AGENTS,
        layout::TOOLS,
        layout::HOOKS,
        layout::PROVIDERS,
    ] {
        let dir = staging.join(category);
        let non_empty = dir.is_dir()
            && std::fs::read_dir(&dir)
                .with_context(|| format!("Failed to read {}", dir.display()))?
                .next()
                .is_some();
        if non_empty && !dir.join(PACKAGE_MARKER).exists() {
            atomic_write(&dir.join(PACKAGE_MARKER), b"")?;
        }
    }
    Ok(())
}

/// Replaces `target` with `staging`.
///
/// An existing compilation is first moved aside and restored if the final rename
/// fails, so the previous tree survives any failure. The renames never yield, so
/// a cancelled compile cannot stop between them.
async fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
    if !target.exists() {
        return std::fs::rename(staging, target)
            .with_context(|| format!("Failed to move compiled profile into {}", target.display()));
    }

    let name = target.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let retired = target.with_file_name(format!(".retired-{name}-{}", uuid::Uuid::new_v4().simple()));

    std::fs::rename(target, &retired)
        .with_context(|| format!("Failed to move previous compilation {} aside", target.display()))?;

    if let Err(e) = std::fs::rename(staging, target) {
        if let Err(restore) = std::fs::rename(&retired, target) {
            tracing::warn!("Failed to restore previous compilation {}: {restore}", target.display());
        }
        return Err(e).with_context(|| format!("Failed to move compiled profile into {}", target.display()));
    }

    // Removal runs on the blocking pool and completes even if the caller is cancelled
    let retired = StagingDir::guard(retired);
    if tokio::task::spawn_blocking(move || drop(retired)).await.is_err() {
        tracing::warn!("Removal of the previous compilation of {} panicked", target.display());
    }
    Ok(())
}
