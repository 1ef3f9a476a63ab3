//! Profile discovery and the manifest cache.
//!
//! Discovery scans `<root>/profiles/**/*.md`, applies the schema gate, and copies
//! each accepted file byte-for-byte into the manifest cache:
//!
//! ```text
//! <home>/cache/
//! ├── profiles/<collection-id>/<profile-name>.md
//! ├── standalone/<profile-name>.md
//! └── global/<profile-name>.md
//! ```
//!
//! Discovery is best-effort per file. Unreadable files, malformed front-matter,
//! schema versions other than `2`, missing names and invalid semver versions are
//! logged with `warn!` and skipped; they never fail the batch.

use crate::constants::{MANIFEST_EXTENSION, PROFILES_DIR};
use crate::core::ProfileError;
use crate::profile::ProfileManifest;
use crate::source::validate_collection_id;
use crate::utils::fs::{atomic_write, ensure_dir};
use crate::utils::validate_logical_name;
use anyhow::{Context, Result};
use glob::Pattern;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a cached manifest lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Profiles of one registered collection
    Collection(String),
    /// Profiles that belong to no collection
    Standalone,
    /// Default profiles shared by everything
    Global,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(id) => write!(f, "collection '{id}'"),
            Self::Standalone => write!(f, "standalone"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// On-disk cache of validated manifests, one directory per namespace.
#[derive(Debug, Clone)]
pub struct ManifestCache {
    profiles_dir: PathBuf,
    standalone_dir: PathBuf,
    global_dir: PathBuf,
}

impl ManifestCache {
    /// Creates a cache over the three namespace roots.
    pub fn new(profiles_dir: PathBuf, standalone_dir: PathBuf, global_dir: PathBuf) -> Self {
        Self {
            profiles_dir,
            standalone_dir,
            global_dir,
        }
    }

    /// Directory holding the manifests of `namespace`.
    pub fn namespace_dir(&self, namespace: &Namespace) -> PathBuf {
        match namespace {
            Namespace::Collection(id) => self.profiles_dir.join(id),
            Namespace::Standalone => self.standalone_dir.clone(),
            Namespace::Global => self.global_dir.clone(),
        }
    }

    /// Path of the cached manifest `name` in `namespace`.
    pub fn manifest_path(&self, namespace: &Namespace, name: &str) -> PathBuf {
        self.namespace_dir(namespace).join(format!("{name}.{MANIFEST_EXTENSION}"))
    }

    /// Reads a cached manifest; `Ok(None)` when it is not cached.
    pub fn load(&self, namespace: &Namespace, name: &str) -> Result<Option<ProfileManifest>> {
        if validate_logical_name(name).is_err() {
            return Ok(None);
        }
        let path = self.manifest_path(namespace, name);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cached manifest {}", path.display()))?;
        ProfileManifest::parse(&content, &path.display().to_string()).map(Some)
    }

    /// Writes `content` as the cached copy of `name`, replacing any previous copy.
    pub fn store(&self, namespace: &Namespace, name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.manifest_path(namespace, name);
        atomic_write(&path, content)?;
        Ok(path)
    }

    /// Deletes cached manifests of `namespace` whose name is not in `keep`.
    ///
    /// Returns how many files were removed.
    pub fn retain(&self, namespace: &Namespace, keep: &[&str]) -> Result<usize> {
        let dir = self.namespace_dir(namespace);
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) || !path.is_file() {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if keep.contains(&stem) {
                continue;
            }
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove stale manifest {}", path.display()))?;
            removed += 1;
        }
        Ok(removed)
    }

    /// All cached manifests of `namespace`, sorted by name.
    ///
    /// Cached files that no longer parse are skipped with a warning.
    pub fn list(&self, namespace: &Namespace) -> Result<Vec<ProfileManifest>> {
        let dir = self.namespace_dir(namespace);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        for entry in std::fs::read_dir(&dir).with_context(|| format!("Failed to list {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) || !path.is_file() {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|content| ProfileManifest::parse(&content, &path.display().to_string()))
            {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => tracing::warn!("Skipping cached manifest {}: {e:#}", path.display()),
            }
        }
        manifests.sort_by(|a, b| a.profile.name.cmp(&b.profile.name));
        Ok(manifests)
    }
}

/// Scans collection roots and populates the [`ManifestCache`].
#[derive(Debug, Clone)]
pub struct ProfileDiscovery {
    cache: ManifestCache,
}

impl ProfileDiscovery {
    /// Creates a discovery service writing into `cache`.
    pub fn new(cache: ManifestCache) -> Self {
        Self {
            cache,
        }
    }

    /// The manifest cache.
    pub fn cache(&self) -> &ManifestCache {
        &self.cache
    }

    /// Discovers the profiles of collection `collection_id` rooted at `collection_root`.
    ///
    /// Returns the accepted manifests. Fails only for an invalid collection id or
    /// when the cache directory cannot be created.
    pub fn discover(&self, collection_id: &str, collection_root: &Path) -> Result<Vec<ProfileManifest>> {
        validate_collection_id(collection_id)?;
        self.scan(&Namespace::Collection(collection_id.to_string()), collection_root)
    }

    /// Discovers profiles under `root` into the standalone namespace.
    pub fn discover_standalone(&self, root: &Path) -> Result<Vec<ProfileManifest>> {
        self.scan(&Namespace::Standalone, root)
    }

    /// Discovers profiles under `root` into the global namespace.
    pub fn discover_global(&self, root: &Path) -> Result<Vec<ProfileManifest>> {
        self.scan(&Namespace::Global, root)
    }

    fn scan(&self, namespace: &Namespace, root: &Path) -> Result<Vec<ProfileManifest>> {
        let target_dir = self.cache.namespace_dir(namespace);
        ensure_dir(&target_dir).map_err(|e| ProfileError::ConfigError {
            message: format!("Cannot create manifest cache {}: {e:#}", target_dir.display()),
        })?;

        let candidates = find_manifest_files(root)?;
        tracing::debug!("Found {} candidate manifest(s) for {} under {}", candidates.len(), namespace, root.display());

        let mut accepted: Vec<ProfileManifest> = Vec::new();
        for path in candidates {
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!("Skipping {}: cannot read file: {e}", path.display());
                    continue;
                }
            };
            let Ok(content) = std::str::from_utf8(&bytes) else {
                tracing::warn!("Skipping {}: not valid UTF-8", path.display());
                continue;
            };

            let manifest = match ProfileManifest::parse(content, &path.display().to_string()) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!("Skipping {}: {e:#}", path.display());
                    continue;
                }
            };

            if let Err(e) = validate_logical_name(manifest.name()) {
                tracing::warn!("Skipping {}: {e:#}", path.display());
                continue;
            }

            if let Some(previous) = accepted.iter().position(|m| m.profile.name == manifest.profile.name) {
                tracing::warn!(
                    "Profile '{}' is defined more than once in {}; {} wins",
                    manifest.name(),
                    namespace,
                    path.display()
                );
                accepted.remove(previous);
            }

            match self.cache.store(namespace, manifest.name(), &bytes) {
                Ok(cached) => {
                    tracing::debug!("Cached profile '{}' at {}", manifest.name(), cached.display());
                    accepted.push(manifest);
                }
                Err(e) => tracing::warn!("Skipping {}: failed to cache: {e:#}", path.display()),
            }
        }

        let names: Vec<&str> = accepted.iter().map(ProfileManifest::name).collect();
        let pruned = self.cache.retain(namespace, &names)?;
        if pruned > 0 {
            tracing::debug!("Removed {} stale cached manifest(s) from {}", pruned, namespace);
        }

        tracing::info!("Discovered {} profile(s) for {}", accepted.len(), namespace);
        Ok(accepted)
    }
}

/// Finds `profiles/**/*.md` under `root`, sorted. Symlinks are not followed.
pub fn find_manifest_files(root: &Path) -> Result<Vec<PathBuf>> {
    let profiles_root = root.join(PROFILES_DIR);
    if !profiles_root.is_dir() {
        tracing::debug!("No {} directory under {}", PROFILES_DIR, root.display());
        return Ok(Vec::new());
    }

    let pattern = Pattern::new(&format!("**/*.{MANIFEST_EXTENSION}"))?;
    let mut files: Vec<PathBuf> = WalkDir::new(&profiles_root)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .strip_prefix(&profiles_root)
                .map(|relative| pattern.matches_path(relative))
                .unwrap_or(false)
        })
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();
    Ok(files)
}
