//! Global configuration (`~/.amplifier/config.toml`).
//!
//! ```toml
//! # Root for caches, compiled profiles and state
//! home = "/srv/amplifier"
//!
//! # Packaged resources addressed by `bundled:` references
//! bundled_dir = "/usr/share/amplifier/data"
//!
//! git_timeout_secs = 300
//! operation_timeout_secs = 600
//! ```
//!
//! Every field is optional. Environment variables take precedence over the file:
//!
//! | Variable                | Overrides          |
//! |-------------------------|--------------------|
//! | `AMPLIFIER_CONFIG`      | config file path   |
//! | `AMPLIFIER_HOME`        | `home`             |
//! | `AMPLIFIER_BUNDLED_DIR` | `bundled_dir`      |

use crate::constants::DEFAULT_GIT_TIMEOUT;
use crate::core::ProfileError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "AMPLIFIER_CONFIG";
/// Environment variable overriding [`GlobalConfig::home`].
pub const HOME_ENV: &str = "AMPLIFIER_HOME";
/// Environment variable overriding [`GlobalConfig::bundled_dir`].
pub const BUNDLED_DIR_ENV: &str = "AMPLIFIER_BUNDLED_DIR";

/// User-wide settings for the profile pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Root directory for all state. Defaults to `~/.amplifier`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home: Option<PathBuf>,

    /// Directory that `bundled:` references resolve against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundled_dir: Option<PathBuf>,

    /// Timeout for a single git command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_timeout_secs: Option<u64>,

    /// Timeout for whole service operations (discover, compile, ...). Unbounded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_timeout_secs: Option<u64>,
}

impl GlobalConfig {
    /// Loads the configuration from `path`, `$AMPLIFIER_CONFIG`, or the default
    /// location, then applies environment overrides.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not valid TOML.
    pub async fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = match path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
            Some(path) => path,
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            Self::load_from(&path).await?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Loads the configuration from a specific file, without environment overrides.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            ProfileError::ConfigError {
                message: format!("Invalid config file {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Writes the configuration as TOML, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Applies `AMPLIFIER_HOME` and `AMPLIFIER_BUNDLED_DIR` using `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(home) = lookup(HOME_ENV).filter(|v| !v.is_empty()) {
            self.home = Some(PathBuf::from(shellexpand::tilde(&home).as_ref()));
        }
        if let Some(dir) = lookup(BUNDLED_DIR_ENV).filter(|v| !v.is_empty()) {
            self.bundled_dir = Some(PathBuf::from(shellexpand::tilde(&dir).as_ref()));
        }
    }

    /// `~/.amplifier/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        Ok(default_home()?.join("config.toml"))
    }

    /// The configured home, or `~/.amplifier`.
    pub fn home_dir(&self) -> Result<PathBuf> {
        match self.home {
            Some(ref home) => Ok(home.clone()),
            None => default_home(),
        }
    }

    /// Per-command git timeout, defaulting to five minutes.
    pub fn git_timeout(&self) -> Duration {
        self.git_timeout_secs.map_or(DEFAULT_GIT_TIMEOUT, Duration::from_secs)
    }

    /// Deadline for whole service operations; `None` when unset.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_secs.map(Duration::from_secs)
    }
}

fn default_home() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
        .join(".amplifier"))
}
