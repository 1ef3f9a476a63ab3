//! Configuration and on-disk layout.
//!
//! [`GlobalConfig`] holds user settings; [`Layout`] derives every path the pipeline
//! reads or writes from the configured home directory:
//!
//! ```text
//! <home>/
//! ├── config.toml
//! ├── collections.txt          collection source registry
//! ├── active_profile           active profile pointer
//! ├── cache/
//! │   ├── profiles/<id>/       validated manifests per collection
//! │   ├── standalone/          standalone namespace
//! │   ├── global/              global namespace
//! │   └── git/                 commit-keyed git checkouts
//! └── compiled/<id>/<name>/    compiled profiles
//! ```

mod global;

pub use global::{BUNDLED_DIR_ENV, CONFIG_ENV, GlobalConfig, HOME_ENV};

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Paths derived from the home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at `home`.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
        }
    }

    /// Builds the layout for `config`'s home directory.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        Ok(Self::new(config.home_dir()?))
    }

    /// The home directory every other path is derived from.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Collection registry, `<home>/collections.txt`.
    pub fn sources_file(&self) -> PathBuf {
        self.home.join("collections.txt")
    }

    /// Active profile marker, `<home>/active_profile`.
    pub fn active_profile_file(&self) -> PathBuf {
        self.home.join("active_profile")
    }

    /// Cached collection manifests, one directory per collection id.
    pub fn profile_cache_dir(&self) -> PathBuf {
        self.home.join("cache").join("profiles")
    }

    /// Cached standalone manifests.
    pub fn standalone_cache_dir(&self) -> PathBuf {
        self.home.join("cache").join("standalone")
    }

    /// Cached global manifests.
    pub fn global_cache_dir(&self) -> PathBuf {
        self.home.join("cache").join("global")
    }

    /// Commit-keyed git checkouts.
    pub fn git_cache_dir(&self) -> PathBuf {
        self.home.join("cache").join("git")
    }

    /// Root of compiled profiles, `<home>/compiled/<collection>/<profile>/`.
    pub fn compiled_dir(&self) -> PathBuf {
        self.home.join("compiled")
    }
}
