//! Constants shared across the profile pipeline.
//!
//! Directory names, file names, and default timeouts live here so the on-disk
//! layout that external loaders depend on is defined in exactly one place.

use std::time::Duration;

/// The only manifest schema version accepted by the pipeline.
pub const SUPPORTED_SCHEMA_VERSION: i64 = 2;

/// Manifest file extension scanned by discovery.
pub const MANIFEST_EXTENSION: &str = "md";

/// Directory inside a collection root that holds profile manifests.
pub const PROFILES_DIR: &str = "profiles";

/// Package marker written at the compiled root and in each non-empty category.
pub const PACKAGE_MARKER: &str = "__init__.py";

/// Resolved profile written alongside the compiled asset tree.
pub const RESOLVED_PROFILE_FILE: &str = "profile.json";

/// Prefix of git references.
pub const GIT_REF_PREFIX: &str = "git+";

/// Prefix of bundled package references.
pub const BUNDLED_REF_PREFIX: &str = "bundled:";

/// Alternative subpath spelling accepted after a git reference.
pub const SUBDIRECTORY_FRAGMENT: &str = "#subdirectory=";

/// Compiled layout category directories.
pub mod layout {
    /// Orchestrator module
    pub const ORCHESTRATOR: &str = "orchestrator";
    /// Session context-manager module
    pub const CONTEXT_MANAGER: &str = "context_manager";
    /// Context references, one directory per key
    pub const CONTEXTS: &str = "contexts";
    /// Agent files, one per agent name
    pub const AGENTS: &str = "agents";
    /// Tool modules
    pub const TOOLS: &str = "tools";
    /// Hook modules
    pub const HOOKS: &str = "hooks";
    /// Provider modules
    pub const PROVIDERS: &str = "providers";
}

/// Default timeout for a single git command (5 minutes).
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Extension used for agent files whose source has no extension.
pub const DEFAULT_AGENT_EXTENSION: &str = "md";
