//! Profile data model: manifests as parsed from disk and resolved profiles.
//!
//! A manifest is the unresolved content of one profile file:
//!
//! ```yaml
//! ---
//! profile:
//!   name: dev
//!   schema-version: 2
//!   version: 1.2.0
//!   description: Development profile
//!   extends: base
//! session:
//!   orchestrator: { module: loop-streaming, source: "git+https://example.com/orch@v1" }
//!   context-manager: context-simple
//!   max_turns: 40
//! tools:
//!   - module: tool-web
//!     config: { timeout: 30 }
//!   - module: tool-bash
//! agents:
//!   reviewer: bundled:agents/reviewer.md
//! context:
//!   core: git+https://example.com/ctx@main/core
//! ---
//! You are a careful engineering assistant.
//! ```
//!
//! Module entries may be written as a bare module name or as a full mapping.

use crate::constants::SUPPORTED_SCHEMA_VERSION;
use crate::core::ProfileError;
use crate::markdown::FrontmatterParser;
use crate::source::SourceRef;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// A reference to a runtime module. Merge identity is `module` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ModuleRefRepr")]
pub struct ModuleRef {
    /// Module identifier
    pub module: String,
    /// Where to fetch the module from; absent when the runtime provides it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Module configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl ModuleRef {
    /// A module with neither source nor config.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            source: None,
            config: None,
        }
    }

    /// Sets the source reference.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the configuration map.
    pub fn with_config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModuleRefRepr {
    Name(String),
    Full {
        module: String,
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        config: Option<Map<String, Value>>,
    },
}

impl From<ModuleRefRepr> for ModuleRef {
    fn from(repr: ModuleRefRepr) -> Self {
        match repr {
            ModuleRefRepr::Name(module) => Self::new(module),
            ModuleRefRepr::Full {
                module,
                source,
                config,
            } => Self {
                module,
                source,
                config,
            },
        }
    }
}

/// The `session` block: orchestrator, context manager, and free-form settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Orchestrator module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orchestrator: Option<ModuleRef>,
    /// Context-manager module
    #[serde(
        default,
        rename = "context-manager",
        alias = "context_manager",
        alias = "context",
        skip_serializing_if = "Option::is_none"
    )]
    pub context_manager: Option<ModuleRef>,
    /// Any other session settings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SessionConfig {
    /// True when nothing is set.
    pub fn is_empty(&self) -> bool {
        self.orchestrator.is_none() && self.context_manager.is_none() && self.extra.is_empty()
    }
}

/// The `profile` header block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileHeader {
    /// Profile name, unique within a collection
    pub name: String,
    /// Manifest schema version
    #[serde(rename = "schema-version", alias = "schema_version")]
    pub schema_version: i64,
    /// Semver version string
    pub version: String,
    /// Human readable description
    pub description: String,
    /// Parent profile: `collection/name` or bare `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
}

/// A parsed, unresolved profile file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileManifest {
    /// Header with identity and inheritance
    pub profile: ProfileHeader,
    /// Session modules and settings
    #[serde(default, skip_serializing_if = "SessionConfig::is_empty")]
    pub session: SessionConfig,
    /// Provider modules in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ModuleRef>,
    /// Tool modules in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ModuleRef>,
    /// Hook modules in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<ModuleRef>,
    /// Agent name to reference
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub agents: BTreeMap<String, String>,
    /// Context key to reference
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    /// UI settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<Map<String, Value>>,
    /// Task settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Map<String, Value>>,
    /// Free-text instruction body
    #[serde(skip)]
    pub instruction: String,
}

impl ProfileManifest {
    /// Profile name.
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    /// Parses a manifest file.
    ///
    /// Fails with [`ProfileError::ManifestParseError`] when the front-matter is
    /// missing or malformed, the schema version is not exactly the integer `2`,
    /// a required header field is missing, or `version` is not valid semver.
    /// `origin` names the file in error messages.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let invalid = |reason: String| ProfileError::ManifestParseError {
            file: origin.to_string(),
            reason,
        };

        let (frontmatter, body) =
            FrontmatterParser::new().parse_yaml(content).map_err(|e| invalid(format!("{e:#}")))?;
        let frontmatter = frontmatter.ok_or_else(|| invalid("missing '---' front-matter block".to_string()))?;

        check_schema_version(&frontmatter).map_err(invalid)?;

        let mut manifest: Self = serde_yaml::from_value(frontmatter).map_err(|e| invalid(e.to_string()))?;

        if manifest.profile.name.trim().is_empty() {
            return Err(invalid("profile.name is empty".to_string()).into());
        }
        semver::Version::parse(&manifest.profile.version)
            .map_err(|e| invalid(format!("profile.version '{}' is not valid semver: {e}", manifest.profile.version)))?;

        manifest.instruction = body.trim().to_string();
        Ok(manifest)
    }

    /// Joins every relative filesystem reference onto `base`.
    ///
    /// Applied to a parent that lives outside the child's collection, so that its
    /// relative references keep pointing into the parent's own tree after merging.
    pub fn rebase_relative_references(&mut self, base: &Path) {
        let rebase = |reference: &mut String| {
            if let Ok(SourceRef::Filesystem(path)) = reference.parse::<SourceRef>() {
                if path.is_relative() {
                    *reference = base.join(path).display().to_string();
                }
            }
        };

        let modules = self
            .session
            .orchestrator
            .iter_mut()
            .chain(self.session.context_manager.iter_mut())
            .chain(self.providers.iter_mut())
            .chain(self.tools.iter_mut())
            .chain(self.hooks.iter_mut());
        for source in modules.filter_map(|m| m.source.as_mut()) {
            rebase(source);
        }
        self.agents.values_mut().for_each(&rebase);
        self.context.values_mut().for_each(&rebase);
    }
}

/// Checks `profile.schema-version` (or `schema_version`) on raw front-matter.
///
/// Only the integer `2` passes; absent, quoted, fractional, or other values are
/// rejected with a description of what was found.
pub fn check_schema_version(frontmatter: &serde_yaml::Value) -> std::result::Result<(), String> {
    let header = frontmatter.get("profile").ok_or_else(|| "missing 'profile' block".to_string())?;
    let raw = header
        .get("schema-version")
        .or_else(|| header.get("schema_version"))
        .ok_or_else(|| "profile.schema-version is missing".to_string())?;

    if raw.as_i64() == Some(SUPPORTED_SCHEMA_VERSION) {
        return Ok(());
    }
    let found = serde_yaml::to_string(raw).map(|s| s.trim().to_string()).unwrap_or_else(|_| "?".to_string());
    Err(format!("unsupported schema version {found} (only {SUPPORTED_SCHEMA_VERSION} is accepted)"))
}

/// A profile with its single inheritance hop applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedProfile {
    /// Profile name
    pub name: String,
    /// Schema version of the manifest
    pub schema_version: i64,
    /// Semver version
    pub version: String,
    /// Description
    pub description: String,
    /// Session modules and settings
    #[serde(default)]
    pub session: SessionConfig,
    /// Provider modules, unique by `module`
    #[serde(default)]
    pub providers: Vec<ModuleRef>,
    /// Tool modules, unique by `module`
    #[serde(default)]
    pub tools: Vec<ModuleRef>,
    /// Hook modules, unique by `module`
    #[serde(default)]
    pub hooks: Vec<ModuleRef>,
    /// Agent name to reference
    #[serde(default)]
    pub agents: BTreeMap<String, String>,
    /// Context key to reference
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// UI settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<Map<String, Value>>,
    /// Task settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Map<String, Value>>,
    /// Instruction body
    #[serde(default)]
    pub instruction: String,
    /// Profile names from root ancestor to this profile
    pub inheritance_chain: Vec<String>,
}

impl ResolvedProfile {
    /// Wraps a manifest that has no parent.
    pub fn from_manifest(manifest: ProfileManifest) -> Self {
        let chain = vec![manifest.profile.name.clone()];
        Self {
            name: manifest.profile.name,
            schema_version: manifest.profile.schema_version,
            version: manifest.profile.version,
            description: manifest.profile.description,
            session: manifest.session,
            providers: manifest.providers,
            tools: manifest.tools,
            hooks: manifest.hooks,
            agents: manifest.agents,
            context: manifest.context,
            ui: manifest.ui,
            task: manifest.task,
            instruction: manifest.instruction,
            inheritance_chain: chain,
        }
    }

    /// All modules in compiled-layout order, tagged with their category directory.
    pub fn modules(&self) -> impl Iterator<Item = (&'static str, &ModuleRef)> {
        use crate::constants::layout;
        let session = self
            .session
            .orchestrator
            .iter()
            .map(|m| (layout::ORCHESTRATOR, m))
            .chain(self.session.context_manager.iter().map(|m| (layout::CONTEXT_MANAGER, m)));
        session
            .chain(self.tools.iter().map(|m| (layout::TOOLS, m)))
            .chain(self.hooks.iter().map(|m| (layout::HOOKS, m)))
            .chain(self.providers.iter().map(|m| (layout::PROVIDERS, m)))
    }
}
