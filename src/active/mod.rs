//! Active profile tracking.
//!
//! The active profile is a single collection-qualified name (`collection/profile`)
//! held by a [`StateStore`]. The tracker never validates the name; callers decide
//! whether the profile exists or has been compiled.

use crate::utils::fs::safe_write;
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Minimal key-value store for a single string value.
pub trait StateStore: Send + Sync {
    /// Returns the stored value, if any.
    fn get(&self) -> Result<Option<String>>;

    /// Replaces the stored value.
    fn set(&self, value: &str) -> Result<()>;

    /// Removes the stored value. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}

/// Stores the value as a single line in a file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Creates a store backed by `path`; the file is created on first [`set`](StateStore::set).
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
        }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn get(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read active profile from {}", self.path.display()))?;
        let value = content.lines().next().unwrap_or("").trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn set(&self, value: &str) -> Result<()> {
        safe_write(&self.path, &format!("{value}\n"))
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// In-memory store for tests and embedders that persist state elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    value: Mutex<Option<String>>,
}

impl MemoryStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self) -> Result<Option<String>> {
        let guard = self.value.lock().map_err(|_| anyhow!("Active profile state lock poisoned"))?;
        Ok(guard.clone())
    }

    fn set(&self, value: &str) -> Result<()> {
        let mut guard = self.value.lock().map_err(|_| anyhow!("Active profile state lock poisoned"))?;
        *guard = Some(value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.value.lock().map_err(|_| anyhow!("Active profile state lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}

/// Tracks which profile is active.
pub struct ActiveProfileTracker {
    store: Box<dyn StateStore>,
}

impl std::fmt::Debug for ActiveProfileTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveProfileTracker").finish_non_exhaustive()
    }
}

impl ActiveProfileTracker {
    /// Creates a tracker persisting through `store`.
    pub fn new(store: impl StateStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Records `qualified_name` as the active profile.
    pub fn set_active(&self, qualified_name: &str) -> Result<()> {
        tracing::info!("Active profile set to {}", qualified_name);
        self.store.set(qualified_name)
    }

    /// Returns the active profile, if one was set.
    pub fn get_active(&self) -> Result<Option<String>> {
        self.store.get()
    }

    /// Clears the active profile.
    pub fn clear_active(&self) -> Result<()> {
        tracing::info!("Active profile cleared");
        self.store.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_round_trip() {
        let tracker = ActiveProfileTracker::new(MemoryStateStore::new());
        assert_eq!(tracker.get_active().unwrap(), None);

        tracker.set_active("foundation/dev").unwrap();
        assert_eq!(tracker.get_active().unwrap().as_deref(), Some("foundation/dev"));

        tracker.set_active("foundation/base").unwrap();
        assert_eq!(tracker.get_active().unwrap().as_deref(), Some("foundation/base"));

        tracker.clear_active().unwrap();
        assert_eq!(tracker.get_active().unwrap(), None);
    }

    #[test]
    fn test_file_store_single_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state/active_profile");
        let store = FileStateStore::new(path.clone());

        assert_eq!(store.get().unwrap(), None);
        store.set("foundation/dev").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "foundation/dev\n");

        let tracker = ActiveProfileTracker::new(FileStateStore::new(path.clone()));
        assert_eq!(tracker.get_active().unwrap().as_deref(), Some("foundation/dev"));

        tracker.clear_active().unwrap();
        assert!(!path.exists());
        tracker.clear_active().unwrap();
    }

    #[test]
    fn test_names_are_not_validated() {
        let tracker = ActiveProfileTracker::new(MemoryStateStore::new());
        tracker.set_active("no-such/profile").unwrap();
        assert_eq!(tracker.get_active().unwrap().as_deref(), Some("no-such/profile"));
    }

    #[test]
    fn test_blank_file_reads_as_unset() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("active_profile");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(FileStateStore::new(path).get().unwrap(), None);
    }
}
