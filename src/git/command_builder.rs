//! Type-safe Git command builder for consistent command execution
//!
//! A fluent API for building and executing git commands so every git call in
//! podforge gets the same timeout handling, logging and error mapping.
//!
//! ```rust,ignore
//! use podforge::git::command_builder::GitCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let remote = GitCommand::remote_url()
//!     .current_dir("/path/to/project")
//!     .execute_stdout()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::core::PodforgeError;
use crate::utils::platform::get_git_command;

/// Builder for a single git invocation.
///
/// Defaults: 5 minute timeout, captured output, current process directory,
/// inherited environment plus `GIT_TERMINAL_PROMPT=0` so a missing credential
/// fails fast instead of hanging on a prompt.
pub struct GitCommand {
    args: Vec<String>,
    current_dir: Option<PathBuf>,
    env_vars: Vec<(String, String)>,
    timeout_duration: Option<Duration>,
    /// Dependency identity or other label included in log lines
    context: Option<String>,
    /// For clone commands, the (credential-free) URL for error messages
    clone_url: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            env_vars: vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())],
            timeout_duration: Some(Duration::from_secs(300)),
            context: None,
            clone_url: None,
        }
    }
}

impl GitCommand {
    /// Creates a new Git command builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs the command with `git -C <dir>`.
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

    /// Adds an environment variable for this invocation only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    /// Set a custom timeout for the command (None for no timeout)
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Set a context for logging (e.g., dependency identity)
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn operation_name(full_args: &[String]) -> String {
        let start = if full_args.first().is_some_and(|a| a == "-C") && full_args.len() > 2 {
            2
        } else {
            0
        };
        full_args.get(start).cloned().unwrap_or_else(|| "unknown".to_string())
    }

    /// Execute the command and return the output
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.clone());
        cmd.args(&full_args);

        let label = self.context.as_deref().map(|c| format!("({c}) ")).unwrap_or_default();
        tracing::debug!(target: "git", "{}Executing command: {} {}", label, git_command, display_args(&full_args));

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output_future = cmd.output();
        let output = if let Some(duration) = self.timeout_duration {
            if let Ok(result) = timeout(duration, output_future).await {
                result.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        anyhow::Error::new(PodforgeError::GitNotFound)
                    } else {
                        anyhow::Error::new(e)
                            .context(format!("Failed to execute git {}", display_args(&full_args)))
                    }
                })?
            } else {
                tracing::warn!(
                    target: "git",
                    "{}Command timed out after {} seconds: git {}",
                    label,
                    duration.as_secs(),
                    display_args(&full_args)
                );
                return Err(PodforgeError::GitCommandError {
                    operation: Self::operation_name(&full_args),
                    stderr: format!(
                        "Git command timed out after {} seconds. This may indicate network \
                         connectivity issues or an authentication prompt waiting for input",
                        duration.as_secs()
                    ),
                }
                .into());
            }
        } else {
            output_future
                .await
                .with_context(|| format!("Failed to execute git {}", display_args(&full_args)))?
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            tracing::debug!(
                target: "git",
                "{}Command failed with exit code {:?}: {}",
                label,
                output.status.code(),
                stderr.trim()
            );

            let operation = Self::operation_name(&full_args);
            let error = match operation.as_str() {
                "clone" => PodforgeError::GitCloneFailed {
                    url: self.clone_url.unwrap_or_else(|| "unknown".to_string()),
                    reason: stderr,
                },
                "checkout" => {
                    let reference = full_args
                        .iter()
                        .skip_while(|a| *a != "checkout")
                        .nth(1)
                        .cloned()
                        .unwrap_or_default();
                    PodforgeError::GitCheckoutFailed {
                        reference,
                        reason: stderr,
                    }
                }
                _ => PodforgeError::GitCommandError {
                    operation,
                    stderr: if stderr.is_empty() {
                        stdout
                    } else {
                        stderr
                    },
                },
            };
            return Err(error.into());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(
                target: "git::perf",
                "{}Git {} took {:.2}s",
                label,
                Self::operation_name(&full_args),
                elapsed.as_secs_f64()
            );
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(
                target: "git::perf",
                "{}Git {} took {}ms",
                label,
                Self::operation_name(&full_args),
                elapsed.as_millis()
            );
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
        })
    }

    /// Execute the command and return only stdout as a trimmed string
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute the command and only check for success
    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

/// Arguments as they appear in logs, with credentials removed from URLs.
fn display_args(args: &[String]) -> String {
    args.iter().map(|a| super::strip_auth_from_url(a)).collect::<Vec<_>>().join(" ")
}

/// Output from a Git command
pub struct GitCommandOutput {
    /// Standard output from the Git command
    pub stdout: String,
    /// Standard error output from the Git command
    pub stderr: String,
}

// Convenience builders for the operations source acquisition needs

impl GitCommand {
    /// `git clone [--branch <branch>] <url> <target>`
    pub fn clone(url: &str, branch: Option<&str>, target: impl AsRef<Path>) -> Self {
        let mut cmd = Self::new().arg("clone");
        if let Some(branch) = branch {
            cmd = cmd.args(["--branch", branch]);
        }
        cmd = cmd.arg(url).arg(target.as_ref().display().to_string());
        cmd.clone_url = Some(super::strip_auth_from_url(url));
        cmd
    }

    /// `git fetch --all --tags --force`
    pub fn fetch() -> Self {
        Self::new().args(["fetch", "--all", "--tags", "--force"])
    }

    /// `git checkout <ref>`
    pub fn checkout(ref_name: &str) -> Self {
        Self::new().args(["checkout", ref_name])
    }

    /// `git reset --hard <ref>`
    pub fn reset_hard(ref_name: &str) -> Self {
        Self::new().args(["reset", "--hard", ref_name])
    }

    /// `git remote get-url origin`
    pub fn remote_url() -> Self {
        Self::new().args(["remote", "get-url", "origin"])
    }
}
