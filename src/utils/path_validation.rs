//! Path validation to keep references and logical names inside their roots.

use anyhow::{Result, anyhow};
use std::path::{Component, Path};

/// Rejects paths containing `..` components.
///
/// Used for subpaths inside cached repositories and bundled resource paths, which
/// must never escape the directory they are joined to.
pub fn validate_no_traversal(path: &Path) -> Result<()> {
    for component in path.components() {
        if component == Component::ParentDir {
            return Err(anyhow!(
                "Path contains parent directory reference (..): {}",
                path.display()
            ));
        }
    }
    Ok(())
}

/// Validates a logical asset name (agent name, context key, module id) before it is
/// used as a single path component in the compiled layout.
pub fn validate_logical_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(anyhow!("Invalid asset name '{name}'"));
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return Err(anyhow!("Asset name '{name}' must not contain path separators"));
    }
    Ok(())
}
