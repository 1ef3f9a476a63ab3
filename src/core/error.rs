//! Error handling for the profile pipeline
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so callers can match on the exact failure mode
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`ProfileError`] - Enumerated error types for every failure in the pipeline
//! - [`ErrorContext`] - Wrapper that adds suggestions and details for display
//!
//! Library functions return [`anyhow::Result`] and construct typed errors with
//! `.into()`. Callers recover the typed error with `downcast_ref::<ProfileError>()`.
//!
//! # Propagation Policy
//!
//! - Discovery is best-effort per file: a bad manifest is logged and skipped, never raised.
//! - Loading and compilation are fail-fast: the first failure aborts the whole operation.
//! - Nothing is retried automatically.
//!
//! # Examples
//!
//! ```rust,no_run
//! use amplifier_profiles::core::{ProfileError, user_friendly_error};
//!
//! fn load() -> anyhow::Result<()> {
//!     Err(ProfileError::ProfileNotFound {
//!         collection: "foundation".to_string(),
//!         name: "dev".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = load() {
//!     user_friendly_error(e).display();
//! }
//! ```

use super::file_error::FileOperationError;
use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for profile pipeline operations.
///
/// # Error Categories
///
/// ## Reference resolution
/// - [`RefResolution`] - A git, filesystem, or bundled reference could not be resolved
/// - [`InvalidSourceRef`] - A reference string does not follow the grammar
///
/// ## Profiles
/// - [`ProfileNotFound`] - No cached manifest for a `(collection, profile)` pair
/// - [`Inheritance`] - An `extends` target could not be located
/// - [`ProfileCompilation`] - A reference failed during compilation (wraps the cause)
/// - [`ManifestParseError`] - A manifest could not be parsed
///
/// ## Collections
/// - [`InvalidCollectionId`], [`DuplicateCollection`], [`CollectionNotFound`]
///
/// ## Git
/// - [`GitNotFound`], [`GitCommandError`], [`GitCloneFailed`], [`GitCheckoutFailed`]
///
/// [`RefResolution`]: ProfileError::RefResolution
/// [`InvalidSourceRef`]: ProfileError::InvalidSourceRef
/// [`ProfileNotFound`]: ProfileError::ProfileNotFound
/// [`Inheritance`]: ProfileError::Inheritance
/// [`ProfileCompilation`]: ProfileError::ProfileCompilation
/// [`ManifestParseError`]: ProfileError::ManifestParseError
/// [`InvalidCollectionId`]: ProfileError::InvalidCollectionId
/// [`DuplicateCollection`]: ProfileError::DuplicateCollection
/// [`CollectionNotFound`]: ProfileError::CollectionNotFound
/// [`GitNotFound`]: ProfileError::GitNotFound
/// [`GitCommandError`]: ProfileError::GitCommandError
/// [`GitCloneFailed`]: ProfileError::GitCloneFailed
/// [`GitCheckoutFailed`]: ProfileError::GitCheckoutFailed
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A git command exited unsuccessfully or timed out.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git subcommand that failed (e.g. `ls-remote`)
        operation: String,
        /// Captured standard error
        stderr: String,
    },

    /// The git executable could not be found.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// `git clone` failed.
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// Repository URL
        url: String,
        /// Git's error output
        reason: String,
    },

    /// `git checkout` failed.
    #[error("Failed to checkout reference '{reference}' in repository")]
    GitCheckoutFailed {
        /// Reference being checked out
        reference: String,
        /// Git's error output
        reason: String,
    },

    /// A reference could not be fetched or does not exist locally after fetch.
    #[error("Failed to resolve reference '{reference}': {reason}")]
    RefResolution {
        /// The offending reference string, verbatim
        reference: String,
        /// Why resolution failed
        reason: String,
    },

    /// A reference string does not match any supported form.
    #[error("Invalid source reference '{reference}': {reason}")]
    InvalidSourceRef {
        /// The offending reference string
        reference: String,
        /// What is wrong with it
        reason: String,
    },

    /// A collection id contains characters outside `[A-Za-z0-9_-]`.
    #[error("Invalid collection id '{id}': only letters, digits, '_' and '-' are allowed")]
    InvalidCollectionId {
        /// The rejected id
        id: String,
    },

    /// A collection id is already registered.
    #[error("Collection '{id}' is already registered")]
    DuplicateCollection {
        /// The duplicate id
        id: String,
    },

    /// No collection with this id is registered.
    #[error("Collection '{id}' is not registered")]
    CollectionNotFound {
        /// The missing id
        id: String,
    },

    /// No cached manifest exists for the requested profile.
    #[error("Profile '{name}' not found in collection '{collection}'")]
    ProfileNotFound {
        /// Collection (or namespace) that was searched
        collection: String,
        /// Requested profile name
        name: String,
    },

    /// The parent named by `extends` could not be located.
    #[error("Profile '{profile}' extends '{extends}', which could not be found (searched: {searched})")]
    Inheritance {
        /// The child profile
        profile: String,
        /// The `extends` value
        extends: String,
        /// Namespaces that were searched, in order
        searched: String,
    },

    /// A manifest file could not be parsed.
    #[error("Invalid profile manifest {file}: {reason}")]
    ManifestParseError {
        /// Manifest path
        file: String,
        /// Parse failure
        reason: String,
    },

    /// Compilation aborted because of one logical asset.
    #[error("Failed to compile profile '{profile}': {asset} could not be materialized")]
    ProfileCompilation {
        /// Profile being compiled
        profile: String,
        /// Logical asset that triggered the failure, e.g. `agent 'reviewer'`
        asset: String,
        /// The underlying failure, usually [`ProfileError::RefResolution`]
        #[source]
        source: Box<ProfileError>,
    },

    /// A caller-supplied deadline expired.
    #[error("Operation '{operation}' timed out after {seconds} seconds")]
    OperationTimeout {
        /// Operation name
        operation: String,
        /// Deadline in seconds
        seconds: u64,
    },

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description
        message: String,
    },

    /// IO errors from [`std::io::Error`].
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parse errors from [`toml::de::Error`].
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Anything else.
    #[error("{message}")]
    Other {
        /// Message
        message: String,
    },
}

impl ProfileError {
    /// Build a [`ProfileError::RefResolution`] for `reference`.
    pub fn ref_resolution(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RefResolution {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Recover a typed error from an [`anyhow::Error`], falling back to [`ProfileError::Other`]
    /// carrying the full error chain.
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        match error.downcast::<ProfileError>() {
            Ok(typed) => typed,
            Err(other) => Self::Other {
                message: format!("{other:#}"),
            },
        }
    }
}

impl Clone for ProfileError {
    fn clone(&self) -> Self {
        match self {
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitCloneFailed {
                url,
                reason,
            } => Self::GitCloneFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::GitCheckoutFailed {
                reference,
                reason,
            } => Self::GitCheckoutFailed {
                reference: reference.clone(),
                reason: reason.clone(),
            },
            Self::RefResolution {
                reference,
                reason,
            } => Self::RefResolution {
                reference: reference.clone(),
                reason: reason.clone(),
            },
            Self::InvalidSourceRef {
                reference,
                reason,
            } => Self::InvalidSourceRef {
                reference: reference.clone(),
                reason: reason.clone(),
            },
            Self::InvalidCollectionId {
                id,
            } => Self::InvalidCollectionId {
                id: id.clone(),
            },
            Self::DuplicateCollection {
                id,
            } => Self::DuplicateCollection {
                id: id.clone(),
            },
            Self::CollectionNotFound {
                id,
            } => Self::CollectionNotFound {
                id: id.clone(),
            },
            Self::ProfileNotFound {
                collection,
                name,
            } => Self::ProfileNotFound {
                collection: collection.clone(),
                name: name.clone(),
            },
            Self::Inheritance {
                profile,
                extends,
                searched,
            } => Self::Inheritance {
                profile: profile.clone(),
                extends: extends.clone(),
                searched: searched.clone(),
            },
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ProfileCompilation {
                profile,
                asset,
                source,
            } => Self::ProfileCompilation {
                profile: profile.clone(),
                asset: asset.clone(),
                source: source.clone(),
            },
            Self::OperationTimeout {
                operation,
                seconds,
            } => Self::OperationTimeout {
                operation: operation.clone(),
                seconds: *seconds,
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // For errors that don't implement Clone, convert to Other
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper with an optional suggestion and details, rendered for terminal users.
///
/// ```rust,no_run
/// use amplifier_profiles::core::{ErrorContext, ProfileError};
///
/// let context = ErrorContext::new(ProfileError::GitNotFound)
///     .with_suggestion("Install git and make sure it is on PATH");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ProfileError,
    /// Optional hint on how to fix it
    pub suggestion: Option<String>,
    /// Optional extra explanation
    pub details: Option<String>,
}

impl ErrorContext {
    /// Wrap an error without suggestion or details.
    #[must_use]
    pub const fn new(error: ProfileError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Print to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions where the failure is recognized.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(profile_error) = error.downcast_ref::<ProfileError>() {
        return create_error_context(profile_error.clone());
    }

    if let Some(file_error) = error.downcast_ref::<FileOperationError>() {
        return ErrorContext::new(ProfileError::Other {
            message: file_error.user_message(),
        });
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(ProfileError::Other {
                message: format!("{error:#}"),
            })
            .with_suggestion("Check ownership and permissions of the amplifier home directory");
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(ProfileError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your config.toml");
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(ProfileError::Other {
        message,
    })
}

fn create_error_context(error: ProfileError) -> ErrorContext {
    let (suggestion, details): (Option<String>, Option<String>) = match &error {
        ProfileError::GitNotFound => (
            Some("Install git from https://git-scm.com/ and make sure it is on PATH".to_string()),
            Some("Git references are fetched with the system git command".to_string()),
        ),
        ProfileError::GitCloneFailed {
            reason,
            ..
        } => (
            Some("Check the repository URL and your network or credentials".to_string()),
            Some(reason.clone()),
        ),
        ProfileError::GitCommandError {
            stderr,
            ..
        }
        | ProfileError::GitCheckoutFailed {
            reason: stderr,
            ..
        } => (None, Some(stderr.clone())),
        ProfileError::RefResolution {
            ..
        } => (
            Some(
                "Git references need an explicit ref (git+<url>@<ref>), filesystem references must be \
                 absolute, and bundled references must exist in the bundled data directory"
                    .to_string(),
            ),
            None,
        ),
        ProfileError::InvalidSourceRef {
            ..
        } => (
            Some(
                "Use one of: git+<url>@<ref>[/<subpath>], an absolute path, or bundled:<resource-path>"
                    .to_string(),
            ),
            None,
        ),
        ProfileError::ProfileNotFound {
            collection,
            ..
        } => (
            Some(format!(
                "Run 'amplifier-profiles discover {collection}' to refresh the profile cache"
            )),
            None,
        ),
        ProfileError::Inheritance {
            ..
        } => (
            Some(
                "Check the 'extends' value; use 'collection/profile' to name a parent in another collection"
                    .to_string(),
            ),
            None,
        ),
        ProfileError::ProfileCompilation {
            source,
            ..
        } => (None, Some(source.to_string())),
        ProfileError::CollectionNotFound {
            ..
        } => (
            Some("Register it with 'amplifier-profiles source add <id> <source-ref>'".to_string()),
            None,
        ),
        ProfileError::OperationTimeout {
            ..
        } => (
            Some("Raise operation_timeout_secs in config.toml or check network access".to_string()),
            None,
        ),
        _ => (None, None),
    };

    ErrorContext {
        error,
        suggestion,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_resolution_names_reference() {
        let err = ProfileError::ref_resolution("git+https://example.com/repo@main", "not found");
        assert!(err.to_string().contains("git+https://example.com/repo@main"));
    }

    #[test]
    fn test_compilation_error_source_chain() {
        let err = ProfileError::ProfileCompilation {
            profile: "dev".to_string(),
            asset: "agent 'reviewer'".to_string(),
            source: Box::new(ProfileError::ref_resolution("/missing/agent.md", "path does not exist")),
        };
        assert!(err.to_string().contains("agent 'reviewer'"));

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("/missing/agent.md"));
    }

    #[test]
    fn test_clone_io_error_becomes_other() {
        let err = ProfileError::IoError(std::io::Error::other("disk full"));
        let cloned = err.clone();
        assert!(matches!(cloned, ProfileError::Other { .. }));
        assert!(cloned.to_string().contains("disk full"));
    }

    #[test]
    fn test_from_anyhow_preserves_typed_error() {
        let err: anyhow::Error = ProfileError::GitNotFound.into();
        assert!(matches!(ProfileError::from_anyhow(err), ProfileError::GitNotFound));

        let err = anyhow::anyhow!("plain failure");
        match ProfileError::from_anyhow(err) {
            ProfileError::Other {
                message,
            } => assert_eq!(message, "plain failure"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_user_friendly_error_suggestions() {
        let ctx = user_friendly_error(
            ProfileError::ProfileNotFound {
                collection: "foundation".to_string(),
                name: "dev".to_string(),
            }
            .into(),
        );
        assert!(ctx.suggestion.unwrap().contains("discover foundation"));

        let ctx = user_friendly_error(anyhow::anyhow!("outer").context("wrapped"));
        assert!(ctx.to_string().contains("Caused by"));
    }

    #[test]
    fn test_file_errors_use_their_user_message() {
        use crate::core::{FileOperation, FileResultExt};

        let io: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
        let err = io
            .with_file_context(FileOperation::Write, "/home/me/.amplifier/collections.txt", "registry", "source")
            .unwrap_err();

        let ctx = user_friendly_error(err.into());
        let rendered = ctx.to_string();
        assert!(rendered.contains("Failed writing"));
        assert!(rendered.contains("Permission denied. Check permissions"));
    }
}
