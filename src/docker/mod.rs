//! Container engine client.
//!
//! Builds run through the `docker` CLI. Creating the client only locates the
//! binary; a machine without docker still resolves dependencies, and the build
//! step reports the missing engine when it actually needs it.

use std::fmt;
use std::path::{Path, PathBuf};

/// Access to a container engine.
pub trait DockerClient: fmt::Debug + Send + Sync {
    /// Whether an engine binary was found.
    fn is_available(&self) -> bool;

    /// Path of the engine binary, when found.
    fn binary(&self) -> Option<&Path>;
}

/// [`DockerClient`] driving the `docker` executable.
#[derive(Debug, Clone, Default)]
pub struct DockerCli {
    binary: Option<PathBuf>,
}

impl DockerCli {
    /// Looks `docker` up on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        let binary = which::which("docker").ok();
        match &binary {
            Some(path) => tracing::trace!("Using docker at {}", path.display()),
            None => tracing::debug!("docker not found in PATH, image builds will be unavailable"),
        }
        Self {
            binary,
        }
    }

    /// Uses an explicit binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }
}

impl DockerClient for DockerCli {
    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}
