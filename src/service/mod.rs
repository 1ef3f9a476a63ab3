//! The profile service: one entry point over the whole pipeline.
//!
//! A caller (HTTP layer, CLI) typically runs discover, load, compile and activate
//! in that order. Each operation is optionally bounded by the configured
//! operation timeout and surfaces [`ProfileError::OperationTimeout`] on expiry.
//!
//! Besides registered collections, [`ProfileService::discover_all`] also populates
//! the two inheritance namespaces:
//!
//! - standalone profiles from `<home>/profiles/`
//! - global profiles from `<bundled_dir>/profiles/`, when a bundled directory is configured

use crate::active::{ActiveProfileTracker, FileStateStore};
use crate::cache::GitCache;
use crate::config::{GlobalConfig, Layout};
use crate::core::ProfileError;
use crate::discovery::{ManifestCache, Namespace, ProfileDiscovery};
use crate::git::{GitBackend, SystemGit};
use crate::loader::ProfileLoader;
use crate::profile::{ProfileManifest, ResolvedProfile};
use crate::resolver::RefResolver;
use crate::source::{CollectionSource, SourceRegistry, validate_collection_id};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Facade over registry, resolver, discovery, loader, compiler and tracker.
#[derive(Debug)]
pub struct ProfileService<G = SystemGit> {
    config: GlobalConfig,
    layout: Layout,
    resolver: Arc<RefResolver<G>>,
    discovery: ProfileDiscovery,
    loader: ProfileLoader,
    compiler: crate::compiler::ProfileCompiler<G>,
    tracker: ActiveProfileTracker,
}

impl ProfileService<SystemGit> {
    /// Builds a service using the system `git` binary.
    pub fn from_config(config: GlobalConfig) -> Result<Self> {
        let backend = SystemGit::new(Some(config.git_timeout()));
        Self::with_backend(config, backend)
    }
}

impl<G: GitBackend> ProfileService<G> {
    /// Builds a service with a custom git backend.
    pub fn with_backend(config: GlobalConfig, backend: G) -> Result<Self> {
        let layout = Layout::from_config(&config)?;
        let git_cache = GitCache::new(layout.git_cache_dir(), backend);
        let resolver = Arc::new(RefResolver::new(git_cache, config.bundled_dir.clone()));

        let cache = ManifestCache::new(
            layout.profile_cache_dir(),
            layout.standalone_cache_dir(),
            layout.global_cache_dir(),
        );
        let discovery = ProfileDiscovery::new(cache.clone());
        let loader = ProfileLoader::new(cache)
            .with_namespace_roots(Some(layout.home().to_path_buf()), config.bundled_dir.clone());
        let compiler = crate::compiler::ProfileCompiler::new(Arc::clone(&resolver), layout.compiled_dir());
        let tracker = ActiveProfileTracker::new(FileStateStore::new(layout.active_profile_file()));

        Ok(Self {
            config,
            layout,
            resolver,
            discovery,
            loader,
            compiler,
            tracker,
        })
    }

    /// On-disk layout derived from the configuration.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The configuration the service was built from.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Loads the collection registry from disk.
    pub fn sources(&self) -> Result<SourceRegistry> {
        SourceRegistry::load(&self.layout.sources_file())
    }

    /// Registers a new collection.
    pub fn add_source(&self, id: &str, source_ref: &str) -> Result<CollectionSource> {
        let mut registry = self.sources()?;
        let added = registry.add(id, source_ref)?.clone();
        tracing::info!("Registered collection '{}' -> {}", added.id, added.raw_ref);
        Ok(added)
    }

    /// Resolves the collection's source and discovers its profiles.
    pub async fn discover_collection(&self, collection_id: &str) -> Result<Vec<ProfileManifest>> {
        self.bounded(format!("discover {collection_id}"), async {
            let root = self.collection_root(collection_id).await?;
            let discovery = self.discovery.clone();
            let id = collection_id.to_string();
            tokio::task::spawn_blocking(move || discovery.discover(&id, &root))
                .await
                .context("Discovery task panicked")?
        })
        .await
    }

    /// Discovers every registered collection plus the standalone and global namespaces.
    ///
    /// A collection that fails to resolve is logged and skipped.
    pub async fn discover_all(&self) -> Result<BTreeMap<String, Vec<ProfileManifest>>> {
        let registry = self.sources()?;
        let mut discovered = BTreeMap::new();

        for source in registry.list() {
            match self.discover_collection(&source.id).await {
                Ok(profiles) => {
                    discovered.insert(source.id.clone(), profiles);
                }
                Err(e) => tracing::warn!("Skipping collection '{}': {e:#}", source.id),
            }
        }

        let standalone_root = self.layout.home().to_path_buf();
        let global_root = self.config.bundled_dir.clone();
        let discovery = self.discovery.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            discovery.discover_standalone(&standalone_root)?;
            if let Some(root) = global_root {
                discovery.discover_global(&root)?;
            }
            Ok(())
        })
        .await
        .context("Discovery task panicked")??;

        Ok(discovered)
    }

    /// Lists cached manifests of a namespace.
    pub fn list_cached(&self, namespace: &Namespace) -> Result<Vec<ProfileManifest>> {
        self.discovery.cache().list(namespace)
    }

    /// Loads a profile from the manifest cache and applies inheritance.
    pub async fn load(&self, collection_id: &str, profile_name: &str) -> Result<ResolvedProfile> {
        self.bounded(format!("load {collection_id}/{profile_name}"), async {
            self.loader.load(collection_id, profile_name)
        })
        .await
    }

    /// Loads and compiles a profile.
    ///
    /// Relative references resolve against the collection root; those inherited
    /// from a standalone or global parent were already joined onto its root.
    pub async fn compile(&self, collection_id: &str, profile_name: &str) -> Result<PathBuf> {
        self.bounded(format!("compile {collection_id}/{profile_name}"), async {
            let profile = self.loader.load(collection_id, profile_name)?;
            let base = match self.collection_root(collection_id).await {
                Ok(root) => Some(root),
                Err(e) => {
                    tracing::warn!(
                        "Cannot resolve the root of collection '{}'; relative references will fail: {e:#}",
                        collection_id
                    );
                    None
                }
            };
            self.compiler.compile(collection_id, &profile, base.as_deref()).await
        })
        .await
    }

    /// Marks `qualified_name` (`collection/profile`) active, optionally compiling it first.
    ///
    /// Returns the compiled directory when `compile_first` is set.
    pub async fn activate(&self, qualified_name: &str, compile_first: bool) -> Result<Option<PathBuf>> {
        let (collection_id, profile_name) = split_qualified(qualified_name)?;
        let compiled = if compile_first {
            Some(self.compile(collection_id, profile_name).await?)
        } else {
            None
        };
        self.tracker.set_active(qualified_name)?;
        Ok(compiled)
    }

    /// The active profile, if any.
    pub fn active(&self) -> Result<Option<String>> {
        self.tracker.get_active()
    }

    /// Clears the active profile.
    pub fn deactivate(&self) -> Result<()> {
        self.tracker.clear_active()
    }

    async fn collection_root(&self, collection_id: &str) -> Result<PathBuf> {
        validate_collection_id(collection_id)?;
        let registry = self.sources()?;
        let source = registry.require(collection_id)?;
        // Relative filesystem sources are relative to the home directory
        self.resolver.resolve_with_base(&source.raw_ref, Some(self.layout.home())).await
    }

    async fn bounded<T>(&self, operation: String, fut: impl Future<Output = Result<T>>) -> Result<T> {
        with_timeout(&operation, self.config.operation_timeout(), fut).await
    }
}

/// Splits `collection/profile`.
pub fn split_qualified(qualified_name: &str) -> Result<(&str, &str)> {
    match qualified_name.split_once('/') {
        Some((collection, name)) if !collection.is_empty() && !name.is_empty() => {
            validate_collection_id(collection)?;
            Ok((collection, name))
        }
        _ => Err(ProfileError::Other {
            message: format!("Expected 'collection/profile', got '{qualified_name}'"),
        }
        .into()),
    }
}

/// Runs `fut` under an optional deadline.
pub async fn with_timeout<T>(
    operation: &str,
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProfileError::OperationTimeout {
                operation: operation.to_string(),
                seconds: limit.as_secs(),
            }
            .into()),
        },
    }
}
