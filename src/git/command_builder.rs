//! Type-safe Git command builder for consistent command execution
//!
//! A fluent API for building and executing git commands so that every call site
//! shares the same timeout handling, logging and error mapping.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::DEFAULT_GIT_TIMEOUT;
use crate::core::ProfileError;

/// Builder for constructing and executing git commands.
///
/// ```rust,ignore
/// use amplifier_profiles::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let head = GitCommand::current_commit()
///     .current_dir("/path/to/repo")
///     .with_context("foundation")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// New commands default to a 5 minute timeout, captured output, and the
/// process working directory.
pub struct GitCommand {
    /// Command arguments to pass to git
    args: Vec<String>,

    /// Working directory, passed to git with `-C`
    current_dir: Option<PathBuf>,

    /// Environment variables to set for the git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for command completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional context string for log messages
    context: Option<String>,

    /// For clone commands, the URL for error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Never block on credential prompts
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(DEFAULT_GIT_TIMEOUT),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Creates a new git command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the working directory for the command.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Adds a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Overrides the timeout. `None` waits indefinitely.
    pub fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Adds a context label to log messages, e.g. the reference being resolved.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Execute the command and return the output
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = super::get_git_command();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());
        cmd.args(&full_args);

        let ctx = self.context.as_deref().unwrap_or("git");
        tracing::debug!(target: "git", "({}) Executing command: {} {}", ctx, git_command, full_args.join(" "));

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        // Skip -C and its path when naming the operation
        let operation = self.args.first().cloned().unwrap_or_else(|| "unknown".to_string());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result.map_err(|e| spawn_error(e, &full_args))?,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(ProfileError::GitCommandError {
                        operation,
                        stderr: format!(
                            "Git command timed out after {} seconds. This may indicate network \
                             issues or an authentication prompt waiting for input.",
                            duration.as_secs()
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future.await.map_err(|e| spawn_error(e, &full_args))?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            tracing::debug!(
                target: "git",
                "({}) Command failed with exit code {:?}: {}",
                ctx,
                output.status.code(),
                stderr.trim()
            );

            let error = match operation.as_str() {
                "clone" => ProfileError::GitCloneFailed {
                    url: self.clone_url.unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                },
                "checkout" => ProfileError::GitCheckoutFailed {
                    reference: self.args.get(self.args.len().saturating_sub(1)).cloned().unwrap_or_default(),
                    reason: stderr,
                },
                _ => ProfileError::GitCommandError {
                    operation,
                    stderr,
                },
            };
            return Err(error.into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "({}) Git {} took {:.2}s", ctx, operation, elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "({}) Git {} took {}ms", ctx, operation, elapsed.as_millis());
        }

        Ok(GitCommandOutput {
            stdout,
        })
    }

    /// Execute the command and return only stdout as a trimmed string
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and check for success
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Maps a failure to run git at all; a missing executable becomes [`ProfileError::GitNotFound`].
fn spawn_error(error: std::io::Error, args: &[String]) -> anyhow::Error {
    if error.kind() == std::io::ErrorKind::NotFound {
        return ProfileError::GitNotFound.into();
    }
    anyhow::Error::new(error).context(format!("Failed to execute git {}", args.join(" ")))
}

/// Output from a git command
pub struct GitCommandOutput {
    /// Standard output
    pub stdout: String,
}

// Convenience builders for the operations the resolver needs

impl GitCommand {
    /// `git clone --no-checkout <url> <target>`
    ///
    /// Checkout is deferred so the working tree is only populated at the
    /// requested commit.
    pub fn clone(url: &str, target: impl AsRef<Path>) -> Self {
        let mut cmd =
            Self::new().args(["clone", "--no-checkout", "--quiet", url]).arg(target.as_ref().display().to_string());
        cmd.clone_url = Some(url.to_string());
        cmd
    }

    /// `git checkout --detach --quiet <ref>`
    pub fn checkout_detached(ref_name: &str) -> Self {
        Self::new().args(["checkout", "--detach", "--quiet", ref_name])
    }

    /// `git ls-remote <url> <ref>` including peeled tags
    pub fn ls_remote(url: &str, ref_name: &str) -> Self {
        Self::new().args(["ls-remote", url, ref_name, &format!("{ref_name}^{{}}")])
    }

    /// `git rev-parse HEAD`
    pub fn current_commit() -> Self {
        Self::new().args(["rev-parse", "HEAD"])
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_builder_records_url() {
        let cmd = GitCommand::clone("https://example.com/repo.git", "/tmp/target");
        assert_eq!(cmd.args[0], "clone");
        assert!(cmd.args.contains(&"--no-checkout".to_string()));
        assert_eq!(cmd.clone_url.as_deref(), Some("https://example.com/repo.git"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("/tmp/target"));
    }

    #[test]
    fn test_ls_remote_includes_peeled_pattern() {
        let cmd = GitCommand::ls_remote("https://example.com/repo.git", "v1.0.0");
        assert_eq!(cmd.args, vec!["ls-remote", "https://example.com/repo.git", "v1.0.0", "v1.0.0^{}"]);
    }

    #[test]
    fn test_default_disables_terminal_prompt() {
        let cmd = GitCommand::new();
        assert!(cmd.env_vars.iter().any(|(k, v)| k == "GIT_TERMINAL_PROMPT" && v == "0"));
        assert_eq!(cmd.timeout_duration, Some(DEFAULT_GIT_TIMEOUT));
    }

    #[test]
    fn test_missing_executable_is_git_not_found() {
        let args = vec!["ls-remote".to_string()];
        let err = spawn_error(std::io::Error::from(std::io::ErrorKind::NotFound), &args);
        assert!(matches!(err.downcast_ref::<ProfileError>(), Some(ProfileError::GitNotFound)));

        let err = spawn_error(std::io::Error::from(std::io::ErrorKind::PermissionDenied), &args);
        assert!(err.downcast_ref::<ProfileError>().is_none());
        assert!(err.to_string().contains("Failed to execute git ls-remote"));
    }

    #[tokio::test]
    async fn test_failed_command_maps_to_typed_error() {
        let temp = tempfile::tempdir().unwrap();
        // rev-parse outside a repository fails
        let err = GitCommand::current_commit().current_dir(temp.path()).execute().await;
        if let Err(e) = err {
            // When git is missing the error is an execution failure instead
            if let Some(typed) = e.downcast_ref::<ProfileError>() {
                assert!(matches!(typed, ProfileError::GitCommandError { operation, .. } if operation == "rev-parse"));
            }
        }
    }
}
