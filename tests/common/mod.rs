//! Shared fixtures for integration tests.

#![allow(dead_code)]

use amplifier_profiles::config::GlobalConfig;
use amplifier_profiles::core::ProfileError;
use amplifier_profiles::git::GitBackend;
use amplifier_profiles::service::ProfileService;
use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// A git backend that materializes a fixed tree and counts its calls.
#[derive(Clone, Default)]
pub struct CountingGit {
    pub resolves: Arc<AtomicUsize>,
    pub clones: Arc<AtomicUsize>,
    /// Files written into every clone, relative to the clone root
    pub files: Arc<Vec<(String, String)>>,
}

impl CountingGit {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: Arc::new(files.iter().map(|(p, c)| ((*p).to_string(), (*c).to_string())).collect()),
            ..Self::default()
        }
    }

    pub fn clone_count(&self) -> usize {
        self.clones.load(Ordering::SeqCst)
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }
}

impl GitBackend for CountingGit {
    async fn resolve_commit(&self, url: &str, reference: &str) -> Result<String> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if reference == "missing" {
            return Err(ProfileError::ref_resolution(url, "no branch or tag named 'missing'").into());
        }
        Ok(format!("{:0>40}", reference.len()))
    }

    async fn clone_at_commit(&self, _url: &str, _commit: &str, target: &Path) -> Result<()> {
        self.clones.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        for (relative, content) in self.files.iter() {
            let path = target.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, content)?;
        }
        std::fs::create_dir_all(target)?;
        Ok(())
    }
}

/// An isolated amplifier home inside a temp directory.
pub struct TestHome {
    pub temp: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    /// Directory for collection sources outside the home.
    pub fn collection_root(&self, id: &str) -> PathBuf {
        self.temp.path().join("collections").join(id)
    }

    pub fn config(&self) -> GlobalConfig {
        GlobalConfig {
            home: Some(self.home()),
            ..GlobalConfig::default()
        }
    }

    pub fn service<G: GitBackend>(&self, git: G) -> ProfileService<G> {
        ProfileService::with_backend(self.config(), git).unwrap()
    }

    /// The CLI with its home pointed at this directory.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("amplifier-profiles").unwrap();
        cmd.env("AMPLIFIER_HOME", self.home())
            .env("AMPLIFIER_CONFIG", self.temp.path().join("no-config.toml"))
            .env_remove("AMPLIFIER_BUNDLED_DIR")
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// Downcasts to the typed error.
pub fn profile_error(err: &anyhow::Error) -> &ProfileError {
    err.downcast_ref::<ProfileError>().unwrap_or_else(|| panic!("not a ProfileError: {err:#}"))
}
