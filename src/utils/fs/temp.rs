//! Staging directories with RAII cleanup.
//!
//! A [`StagingDir`] is removed when the last handle to it is dropped unless it
//! was disarmed first. Cancelled futures drop their locals, so a build that is
//! abandoned at an `.await` (for example by a timeout) still cleans up.

use crate::utils::fs::dirs::{ensure_dir, remove_dir_all};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// A directory that is deleted on drop until [`disarm`](Self::disarm) is called.
///
/// Share it through an `Arc` with blocking tasks that write into it; removal then
/// waits for the last writer to finish.
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    armed: AtomicBool,
}

impl StagingDir {
    /// Guards `path` without creating it.
    ///
    /// Used when another process (such as `git clone`) creates the directory.
    pub fn guard(path: PathBuf) -> Self {
        Self {
            path,
            armed: AtomicBool::new(true),
        }
    }

    /// Creates `path` and guards it.
    pub fn create(path: PathBuf) -> Result<Self> {
        ensure_dir(&path)?;
        Ok(Self::guard(path))
    }

    /// The guarded path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keeps the directory; call after it was renamed into place.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.armed.load(Ordering::SeqCst) || !self.path.exists() {
            return;
        }
        if let Err(e) = remove_dir_all(&self.path) {
            tracing::warn!("Failed to remove staging directory {}: {e:#}", self.path.display());
        }
    }
}
