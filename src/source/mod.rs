//! Collection sources and the reference grammar.
//!
//! A collection is a named bundle of profiles addressed by a source reference. The
//! registry persists collections to a plain text file, one per line:
//!
//! ```text
//! # id            source-ref
//! foundation      git+https://github.com/example/profiles@main/foundation
//! local           /opt/amplifier/collections/local
//! builtin         bundled:collections.builtin
//! ```
//!
//! # Reference grammar
//!
//! - `git+<url>@<ref>[/<subpath>]` (or `git+<url>@<ref>#subdirectory=<subpath>`)
//! - `bundled:<dotted-or-slash-path>`
//! - anything else is a filesystem path; `~` is expanded and `file://` stripped
//!
//! The registry is append-only: entries are added, never edited or removed.

use crate::constants::{BUNDLED_REF_PREFIX, GIT_REF_PREFIX, SUBDIRECTORY_FRAGMENT};
use crate::core::{FileOperation, FileResultExt, ProfileError};
use anyhow::{Context, Result};
use regex::Regex;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// A parsed source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A path inside a git repository at a given ref.
    Git {
        /// Repository URL as passed to `git clone`
        url: String,
        /// Branch, tag, or commit
        reference: String,
        /// Optional path inside the repository
        subpath: Option<PathBuf>,
    },
    /// A local filesystem path.
    Filesystem(PathBuf),
    /// A resource path inside the bundled data directory.
    Bundled(String),
}

impl FromStr for SourceRef {
    type Err = ProfileError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = |reason: &str| ProfileError::InvalidSourceRef {
            reference: raw.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(invalid("reference is empty"));
        }

        if let Some(rest) = trimmed.strip_prefix(GIT_REF_PREFIX) {
            return parse_git(rest).map_err(|reason| invalid(&reason));
        }

        if let Some(rest) = trimmed.strip_prefix(BUNDLED_REF_PREFIX) {
            let path = rest.trim_matches('/');
            if path.is_empty() {
                return Err(invalid("bundled reference has no resource path"));
            }
            return Ok(Self::Bundled(path.to_string()));
        }

        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        let expanded = shellexpand::tilde(path);
        Ok(Self::Filesystem(PathBuf::from(expanded.as_ref())))
    }
}

/// Splits `<url>@<ref>[/<subpath>]` (the part after `git+`).
fn parse_git(rest: &str) -> std::result::Result<SourceRef, String> {
    let (locator, fragment_subpath) = match rest.split_once(SUBDIRECTORY_FRAGMENT) {
        Some((locator, sub)) => (locator, Some(sub)),
        None => (rest, None),
    };

    let (url, ref_part) = locator
        .rsplit_once('@')
        .ok_or_else(|| "git reference is missing an explicit '@<ref>' component".to_string())?;

    // Without a ref, `git@host:org/repo` and `ssh://git@host/org/repo` split inside the user part
    let split_in_authority = url.split_once("://").is_some_and(|(_, authority)| !authority.contains('/'));
    if url.is_empty() || ref_part.contains(':') || split_in_authority {
        return Err("git reference is missing an explicit '@<ref>' component".to_string());
    }

    let (reference, path_subpath) = match ref_part.split_once('/') {
        Some((reference, sub)) => (reference, Some(sub)),
        None => (ref_part, None),
    };
    if reference.is_empty() {
        return Err("git reference has an empty ref".to_string());
    }
    if path_subpath.is_some() && fragment_subpath.is_some() {
        return Err("git reference specifies a subpath twice".to_string());
    }

    let subpath = path_subpath
        .or(fragment_subpath)
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    Ok(SourceRef::Git {
        url: url.to_string(),
        reference: reference.to_string(),
        subpath,
    })
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git {
                url,
                reference,
                subpath,
            } => {
                write!(f, "{GIT_REF_PREFIX}{url}@{reference}")?;
                if let Some(sub) = subpath {
                    write!(f, "/{}", sub.display())?;
                }
                Ok(())
            }
            Self::Filesystem(path) => write!(f, "{}", path.display()),
            Self::Bundled(path) => write!(f, "{BUNDLED_REF_PREFIX}{path}"),
        }
    }
}

/// Validates a collection id against `[A-Za-z0-9_-]+`.
pub fn validate_collection_id(id: &str) -> Result<()> {
    let pattern = Regex::new(r"^[A-Za-z0-9_-]+$")?;
    if pattern.is_match(id) {
        Ok(())
    } else {
        Err(ProfileError::InvalidCollectionId {
            id: id.to_string(),
        }
        .into())
    }
}

/// A registered collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSource {
    /// Unique collection id
    pub id: String,
    /// Where the collection comes from
    pub source_ref: SourceRef,
    /// The reference as written in the registry file
    pub raw_ref: String,
}

impl CollectionSource {
    /// Validates `id` and parses `source_ref`.
    pub fn new(id: &str, source_ref: &str) -> Result<Self> {
        validate_collection_id(id)?;
        Ok(Self {
            id: id.to_string(),
            source_ref: source_ref.parse()?,
            raw_ref: source_ref.trim().to_string(),
        })
    }
}

/// Append-only registry of collections backed by a line-oriented file.
#[derive(Debug)]
pub struct SourceRegistry {
    path: PathBuf,
    sources: Vec<CollectionSource>,
}

impl SourceRegistry {
    /// Loads the registry at `path`. A missing file is an empty registry.
    ///
    /// Malformed lines are reported with their line number; ids must be unique.
    pub fn load(path: &Path) -> Result<Self> {
        let mut registry = Self {
            path: path.to_path_buf(),
            sources: Vec::new(),
        };

        if !path.exists() {
            tracing::debug!("No collection registry at {}", path.display());
            return Ok(registry);
        }

        let content = std::fs::read_to_string(path).with_file_context(
            FileOperation::Read,
            path,
            "reading collection registry",
            "source::SourceRegistry::load",
        )?;

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, source_ref) = line.split_once(char::is_whitespace).ok_or_else(|| {
                ProfileError::ConfigError {
                    message: format!(
                        "{}:{}: expected '<collection-id> <source-ref>'",
                        path.display(),
                        index + 1
                    ),
                }
            })?;
            let source = CollectionSource::new(id, source_ref)
                .with_context(|| format!("{}:{}", path.display(), index + 1))?;
            if registry.get(&source.id).is_some() {
                return Err(ProfileError::DuplicateCollection {
                    id: source.id,
                }
                .into());
            }
            registry.sources.push(source);
        }

        tracing::debug!("Loaded {} collection(s) from {}", registry.sources.len(), path.display());
        Ok(registry)
    }

    /// Registers a new collection and appends it to the registry file.
    pub fn add(&mut self, id: &str, source_ref: &str) -> Result<&CollectionSource> {
        let source = CollectionSource::new(id, source_ref)?;
        if self.get(id).is_some() {
            return Err(ProfileError::DuplicateCollection {
                id: id.to_string(),
            }
            .into());
        }

        if let Some(parent) = self.path.parent() {
            crate::utils::fs::ensure_dir(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_file_context(
                FileOperation::Write,
                &self.path,
                "appending to collection registry",
                "source::SourceRegistry::add",
            )?;
        writeln!(file, "{} {}", source.id, source.raw_ref).with_file_context(
            FileOperation::Write,
            &self.path,
            "appending to collection registry",
            "source::SourceRegistry::add",
        )?;

        tracing::info!("Registered collection '{}' -> {}", source.id, source.raw_ref);
        self.sources.push(source);
        Ok(&self.sources[self.sources.len() - 1])
    }

    /// Looks up a collection by id.
    pub fn get(&self, id: &str) -> Option<&CollectionSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Like [`get`](Self::get) but fails with [`ProfileError::CollectionNotFound`].
    pub fn require(&self, id: &str) -> Result<&CollectionSource> {
        self.get(id).ok_or_else(|| {
            ProfileError::CollectionNotFound {
                id: id.to_string(),
            }
            .into()
        })
    }

    /// All collections in registration order.
    pub fn list(&self) -> &[CollectionSource] {
        &self.sources
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
