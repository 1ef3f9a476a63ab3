//! Profile loading with single-level inheritance.
//!
//! `extends` is followed exactly one hop. A bare parent name is searched in the
//! profile's own collection, then the standalone namespace, then the global
//! namespace; the first match wins. A qualified `collection/name` is only looked
//! up in that collection. The parent's own `extends` is ignored.
//!
//! A parent found in the standalone or global namespace has its relative
//! filesystem references joined onto that namespace's root before merging.

use crate::core::ProfileError;
use crate::discovery::{ManifestCache, Namespace};
use crate::merge::merge;
use crate::profile::{ProfileManifest, ResolvedProfile};
use crate::source::validate_collection_id;
use anyhow::Result;
use std::path::PathBuf;

/// Loads cached manifests and applies inheritance.
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    cache: ManifestCache,
    standalone_root: Option<PathBuf>,
    global_root: Option<PathBuf>,
}

impl ProfileLoader {
    /// Creates a loader over `cache`.
    pub fn new(cache: ManifestCache) -> Self {
        Self {
            cache,
            standalone_root: None,
            global_root: None,
        }
    }

    /// Sets the source roots of the standalone and global namespaces.
    pub fn with_namespace_roots(mut self, standalone: Option<PathBuf>, global: Option<PathBuf>) -> Self {
        self.standalone_root = standalone;
        self.global_root = global;
        self
    }

    /// Loads `profile_name` from `collection_id` and resolves its `extends`.
    ///
    /// # Errors
    ///
    /// - [`ProfileError::ProfileNotFound`] when no cached manifest exists
    /// - [`ProfileError::Inheritance`] when the parent cannot be located
    pub fn load(&self, collection_id: &str, profile_name: &str) -> Result<ResolvedProfile> {
        validate_collection_id(collection_id)?;
        let namespace = Namespace::Collection(collection_id.to_string());

        let manifest = self.cache.load(&namespace, profile_name)?.ok_or_else(|| ProfileError::ProfileNotFound {
            collection: collection_id.to_string(),
            name: profile_name.to_string(),
        })?;

        let Some(extends) = manifest.profile.extends.clone() else {
            tracing::debug!("Profile {}/{} has no parent", collection_id, profile_name);
            return Ok(ResolvedProfile::from_manifest(manifest));
        };

        let (mut parent, found_in) = self.find_parent(collection_id, &manifest, &extends)?;
        let root = match found_in {
            Namespace::Standalone => self.standalone_root.as_deref(),
            Namespace::Global => self.global_root.as_deref(),
            Namespace::Collection(_) => None,
        };
        if let Some(root) = root {
            parent.rebase_relative_references(root);
        }
        if let Some(ref grandparent) = parent.profile.extends {
            tracing::debug!(
                "Ignoring '{}' extends '{}': inheritance is limited to one level",
                parent.name(),
                grandparent
            );
        }

        tracing::debug!("Profile {}/{} extends '{}' from {}", collection_id, profile_name, parent.name(), found_in);
        Ok(merge(&parent, &manifest))
    }

    /// Locates the parent named by `extends`, never returning the child itself.
    fn find_parent(
        &self,
        collection_id: &str,
        child: &ProfileManifest,
        extends: &str,
    ) -> Result<(ProfileManifest, Namespace)> {
        let (search, parent_name) = match extends.split_once('/') {
            Some((collection, name)) => (vec![Namespace::Collection(collection.to_string())], name),
            None => (
                vec![Namespace::Collection(collection_id.to_string()), Namespace::Standalone, Namespace::Global],
                extends,
            ),
        };

        let own_namespace = Namespace::Collection(collection_id.to_string());
        for namespace in &search {
            if *namespace == own_namespace && parent_name == child.name() {
                continue;
            }
            if let Some(parent) = self.cache.load(namespace, parent_name)? {
                return Ok((parent, namespace.clone()));
            }
        }

        let searched = search
            .iter()
            .filter(|ns| !(**ns == own_namespace && parent_name == child.name()))
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let searched = if searched.is_empty() {
            "nothing; a profile cannot extend itself".to_string()
        } else {
            searched.join(", ")
        };

        Err(ProfileError::Inheritance {
            profile: format!("{collection_id}/{}", child.name()),
            extends: extends.to_string(),
            searched,
        }
        .into())
    }
}
