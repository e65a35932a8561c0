//! Error handling for podforge
//!
//! This module provides the typed error enum used across podforge together with
//! the user-facing rendering layer used by the CLI. The design follows two rules:
//! 1. **Strongly-typed errors** for precise handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`PodforgeError`] - Enumerated error types for failures outside the dependency graph
//! - [`ErrorContext`] - Wrapper that adds user-friendly details and suggestions
//!
//! The dependency graph keeps its own error types next to the graph store
//! ([`crate::dependency::GraphError`] and [`crate::dependency::CyclicDependencyError`]).
//! The cycle error is deliberately kept out of [`PodforgeError`]: it travels through
//! `anyhow` unwrapped so callers can `downcast_ref` it directly.
//!
//! # Examples
//!
//! ```rust,no_run
//! use podforge::core::{PodforgeError, user_friendly_error};
//!
//! let error = anyhow::Error::from(PodforgeError::GitNotFound);
//! let ctx = user_friendly_error(error);
//! ctx.display(); // colored error with a suggestion
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::core::file_error::FileOperationError;
use crate::dependency::{CyclicDependencyError, GraphError};

/// The main error type for podforge operations.
///
/// # Error Categories
///
/// ## Git Operations
/// - [`GitNotFound`](PodforgeError::GitNotFound) - Git executable not available
/// - [`GitCommandError`](PodforgeError::GitCommandError) - Git command execution failed
/// - [`GitCloneFailed`](PodforgeError::GitCloneFailed) - Repository cloning failed
/// - [`GitCheckoutFailed`](PodforgeError::GitCheckoutFailed) - Checkout failed
///
/// ## Configuration
/// - [`ConfigNotFound`](PodforgeError::ConfigNotFound) - Config file missing
/// - [`ConfigParseError`](PodforgeError::ConfigParseError) - Invalid YAML
/// - [`ProfileNotFound`](PodforgeError::ProfileNotFound) - Unknown profile selected
///
/// ## Dependencies
/// - [`InvalidDependency`](PodforgeError::InvalidDependency) - Malformed declaration
/// - [`DependencySourceNotFound`](PodforgeError::DependencySourceNotFound) - Local source missing
/// - [`CircularDependency`](PodforgeError::CircularDependency) - Display form of a cycle
#[derive(Error, Debug)]
pub enum PodforgeError {
    /// Git operation failed during execution
    ///
    /// # Fields
    /// - `operation`: The git operation that failed (e.g., "clone", "fetch", "checkout")
    /// - `stderr`: The error output from the git command
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// Git repository clone failed
    #[error("Failed to clone repository: {url}")]
    GitCloneFailed {
        /// The repository URL that failed to clone (credentials stripped)
        url: String,
        /// The reason for the clone failure
        reason: String,
    },

    /// Git checkout failed
    #[error("Failed to checkout reference '{reference}' in repository")]
    GitCheckoutFailed {
        /// The git reference (branch, tag, or commit) that failed to checkout
        reference: String,
        /// The reason for the checkout failure
        reason: String,
    },

    /// Project configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the configuration file that was not found
        path: String,
    },

    /// Configuration parsing error
    #[error("Invalid configuration syntax in {file}")]
    ConfigParseError {
        /// Path to the configuration file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A profile was selected that the configuration does not define
    #[error("Profile '{profile}' not found in {file}")]
    ProfileNotFound {
        /// The selected profile
        profile: String,
        /// Configuration file that was searched
        file: String,
    },

    /// Invalid dependency declaration
    #[error("Invalid dependency declaration '{name}': {reason}")]
    InvalidDependency {
        /// Name (or source) of the offending declaration
        name: String,
        /// Reason why the declaration is invalid
        reason: String,
    },

    /// Local dependency source directory is missing
    #[error("Dependency source not found: {path}")]
    DependencySourceNotFound {
        /// The resolved local path that does not exist
        path: String,
    },

    /// Circular dependency detected in the dependency graph
    ///
    /// Only used when rendering a [`CyclicDependencyError`] for the user;
    /// resolution itself surfaces the graph error type.
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// String representation of the circular dependency chain
        chain: String,
    },

    /// Kubeconfig could not be read or did not contain the requested context
    #[error("Kube config error: {reason}")]
    KubeConfigError {
        /// What went wrong
        reason: String,
    },

    /// File system error
    #[error("File system error: {operation}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// The operation that was denied due to insufficient permissions
        operation: String,
        /// Path where permission was denied
        path: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for PodforgeError {
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
            Self::ConfigNotFound {
                path,
            } => Self::ConfigNotFound {
                path: path.clone(),
            },
            Self::ConfigParseError {
                file,
                reason,
            } => Self::ConfigParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ProfileNotFound {
                profile,
                file,
            } => Self::ProfileNotFound {
                profile: profile.clone(),
                file: file.clone(),
            },
            Self::InvalidDependency {
                name,
                reason,
            } => Self::InvalidDependency {
                name: name.clone(),
                reason: reason.clone(),
            },
            Self::DependencySourceNotFound {
                path,
            } => Self::DependencySourceNotFound {
                path: path.clone(),
            },
            Self::CircularDependency {
                chain,
            } => Self::CircularDependency {
                chain: chain.clone(),
            },
            Self::KubeConfigError {
                reason,
            } => Self::KubeConfigError {
                reason: reason.clone(),
            },
            Self::FileSystemError {
                operation,
                path,
            } => Self::FileSystemError {
                operation: operation.clone(),
                path: path.clone(),
            },
            Self::PermissionDenied {
                operation,
                path,
            } => Self::PermissionDenied {
                operation: operation.clone(),
                path: path.clone(),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying a suggestion and extra details for CLI display.
///
/// ```rust,no_run
/// use podforge::core::{PodforgeError, ErrorContext};
///
/// let context = ErrorContext::new(PodforgeError::GitNotFound)
///     .with_suggestion("Install git from https://git-scm.com/")
///     .with_details("podforge requires git to fetch dependency sources");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PodforgeError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: PodforgeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error (displayed in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error (displayed in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
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

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes, in order:
/// - [`CyclicDependencyError`] with a dedicated `--allow-cyclic` hint
/// - [`PodforgeError`] variants with tailored suggestions
/// - [`GraphError`] (reported as an internal error)
/// - [`FileOperationError`] using its own detailed message
/// - [`std::io::Error`] and [`serde_yaml::Error`]
/// - anything else, with the full `Caused by` chain appended
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(cycle) = error.downcast_ref::<CyclicDependencyError>() {
        return ErrorContext::new(PodforgeError::CircularDependency {
            chain: cycle.chain(),
        })
        .with_suggestion(
            "Remove one of the dependency declarations in the cycle, or re-run with --allow-cyclic to drop the closing edge",
        )
        .with_details("Each dependency is resolved exactly once; a cycle makes a build order impossible");
    }

    if let Some(podforge_error) = error.downcast_ref::<PodforgeError>() {
        let mut ctx = create_error_context(podforge_error.clone());
        let chain = format_chain(&error);
        if !chain.is_empty() && ctx.details.is_none() {
            ctx = ctx.with_details(chain);
        }
        return ctx;
    }

    if let Some(graph_error) = error.downcast_ref::<GraphError>() {
        return ErrorContext::new(PodforgeError::Other {
            message: format!("Internal dependency graph error: {graph_error}"),
        })
        .with_details("The resolver used the dependency graph inconsistently. This is a bug in podforge");
    }

    if let Some(file_error) = error.downcast_ref::<FileOperationError>() {
        return ErrorContext::new(PodforgeError::FileSystemError {
            operation: file_error.operation.to_string(),
            path: file_error.file_path.display().to_string(),
        })
        .with_details(file_error.user_message());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(PodforgeError::PermissionDenied {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check file ownership and permissions of the project and ~/.podforge");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(PodforgeError::FileSystemError {
                    operation: "file access".to_string(),
                    path: "unknown".to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(yaml_error) = error.downcast_ref::<serde_yaml::Error>() {
        return ErrorContext::new(PodforgeError::ConfigParseError {
            file: "podforge.yaml".to_string(),
            reason: yaml_error.to_string(),
        })
        .with_suggestion("Check the YAML syntax: indentation, quoting and list markers");
    }

    let mut message = error.to_string();
    let chain = format_chain(&error);
    if !chain.is_empty() {
        message.push_str("\n\n");
        message.push_str(&chain);
    }

    ErrorContext::new(PodforgeError::Other {
        message,
    })
}

fn format_chain(error: &anyhow::Error) -> String {
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    if chain.is_empty() {
        return String::new();
    }

    let mut message = String::from("Caused by:");
    for (i, cause) in chain.iter().enumerate() {
        message.push_str(&format!("\n  {}: {}", i + 1, cause));
    }
    message
}

fn create_error_context(error: PodforgeError) -> ErrorContext {
    match &error {
        PodforgeError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ or with your package manager")
            .with_details("podforge uses the system git binary to fetch dependency sources"),
        PodforgeError::GitCommandError {
            stderr,
            ..
        } => {
            let details = stderr.trim().to_string();
            ErrorContext::new(error)
                .with_suggestion("Check your network connection and repository access rights")
                .with_details(details)
        }
        PodforgeError::GitCloneFailed {
            reason,
            ..
        } => {
            let details = reason.trim().to_string();
            ErrorContext::new(error)
                .with_suggestion("Verify the dependency's git URL and that you have access to it")
                .with_details(details)
        }
        PodforgeError::GitCheckoutFailed {
            reason,
            ..
        } => {
            let details = reason.trim().to_string();
            ErrorContext::new(error)
                .with_suggestion("Check that the branch, tag or revision exists; run 'podforge update' to refetch")
                .with_details(details)
        }
        PodforgeError::ConfigNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Create a podforge.yaml in the project, or set 'configName' on the dependency source"),
        PodforgeError::ConfigParseError {
            reason,
            ..
        } => {
            let details = reason.clone();
            ErrorContext::new(error)
                .with_suggestion("Check the YAML syntax: indentation, quoting and list markers")
                .with_details(details)
        }
        PodforgeError::ProfileNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Define the profile under 'profiles:' or remove the 'profile' setting"),
        PodforgeError::InvalidDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Each dependency source needs exactly one of 'git' or 'path'"),
        PodforgeError::DependencySourceNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Local dependency paths are resolved relative to the declaring project"),
        PodforgeError::KubeConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check KUBECONFIG or ~/.kube/config and the selected context"),
        _ => ErrorContext::new(error),
    }
}
