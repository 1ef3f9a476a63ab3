//! File system utilities for atomic writes, directory trees and staging guards.

pub mod atomic;
pub mod dirs;
pub mod temp;

// Directory operations
pub use dirs::{copy_dir, copy_path, ensure_dir, remove_dir_all};

// Atomic write operations
pub use atomic::{atomic_write, safe_write};

// Staging directories
pub use temp::StagingDir;
