//! Source acquisition: turning a dependency declaration into a local
//! directory.
//!
//! Local (`path`) sources are used in place. Git sources are cloned into
//! `<dependencies dir>/<sha256 of repository and ref>/`, one checkout per
//! repository and ref, shared by every project on the machine. An existing
//! checkout is reused as is unless an update is requested, in which case it
//! is fetched and moved to the latest state of its ref.

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use super::identity::{checkout_key, validate_source};
use super::lock::CheckoutLock;
use crate::config::{SourceConfig, get_dependencies_dir};
use crate::core::PodforgeError;
use crate::git::{GitRepo, strip_auth_from_url};
use crate::utils::{absolutize, sha256_hex};

/// Future returned by [`SourceFetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>>;

/// One acquisition request.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Identity of the dependency, for log lines
    pub id: &'a str,
    /// Directory of the project that declared the dependency
    pub base_path: &'a Path,
    pub source: &'a SourceConfig,
    /// Refresh an existing checkout from its remote
    pub update: bool,
}

/// Makes a dependency's source available locally.
pub trait SourceFetcher: Send + Sync {
    /// Returns the directory holding the dependency's project.
    fn fetch<'a>(&'a self, request: FetchRequest<'a>) -> FetchFuture<'a>;
}

/// [`SourceFetcher`] using git for remote sources.
#[derive(Debug, Clone, Default)]
pub struct DependencyDownloader {
    dependencies_dir: Option<PathBuf>,
}

impl DependencyDownloader {
    /// Downloader using the default dependencies directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Downloader checking git sources out below `dir`.
    pub fn with_dependencies_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dependencies_dir: Some(dir.into()),
        }
    }

    fn dependencies_dir(&self) -> Result<PathBuf> {
        match &self.dependencies_dir {
            Some(dir) => Ok(dir.clone()),
            None => get_dependencies_dir(),
        }
    }

    /// Acquires the source described by `request`.
    pub async fn download(&self, request: FetchRequest<'_>) -> Result<PathBuf> {
        validate_source(request.source)?;
        match request.source.git() {
            Some(url) => self.download_git(request, url).await,
            None => Self::local_source(request.base_path, request.source.path().unwrap_or_default()),
        }
    }

    /// Directory a git source is checked out into.
    pub fn checkout_dir(&self, source: &SourceConfig) -> Result<PathBuf> {
        Ok(self.dependencies_dir()?.join(sha256_hex(checkout_key(source).as_bytes())))
    }

    async fn download_git(&self, request: FetchRequest<'_>, url: &str) -> Result<PathBuf> {
        let source = request.source;
        let dependencies_dir = self.dependencies_dir()?;
        let checkout_dir = self.checkout_dir(source)?;
        let lock_key = checkout_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let _lock = CheckoutLock::acquire(&dependencies_dir, &lock_key).await?;
        let repo = GitRepo::new(&checkout_dir);

        if !repo.is_git_repo() {
            if checkout_dir.exists() {
                tracing::debug!("Removing incomplete checkout {}", checkout_dir.display());
                tokio::fs::remove_dir_all(&checkout_dir).await.with_context(|| {
                    format!("Failed to remove incomplete checkout {}", checkout_dir.display())
                })?;
            }

            tracing::info!("Cloning dependency {} from {}", request.id, strip_auth_from_url(url));
            let reference = source.branch().or_else(|| source.tag());
            GitRepo::clone(url, reference, &checkout_dir, request.id).await?;
            if let Some(revision) = source.revision() {
                repo.checkout(revision, request.id).await?;
            }
        } else if request.update {
            tracing::info!("Updating dependency {}", request.id);
            repo.fetch(request.id).await?;
            if let Some(branch) = source.branch() {
                repo.checkout(branch, request.id).await?;
                repo.reset_hard(&format!("origin/{branch}"), request.id).await?;
            } else if let Some(tag) = source.tag() {
                repo.checkout(&format!("tags/{tag}"), request.id).await?;
            } else if let Some(revision) = source.revision() {
                repo.checkout(revision, request.id).await?;
            } else {
                repo.reset_hard("origin/HEAD", request.id).await?;
            }
        } else {
            tracing::debug!("Reusing checkout {} for {}", checkout_dir.display(), request.id);
        }

        let local_path = match source.sub_path() {
            Some(sub_path) => absolutize(&checkout_dir, Path::new(sub_path.trim_start_matches('/'))),
            None => checkout_dir,
        };
        if !local_path.is_dir() {
            return Err(PodforgeError::DependencySourceNotFound {
                path: local_path.display().to_string(),
            }
            .into());
        }
        Ok(local_path)
    }

    fn local_source(base_path: &Path, path: &str) -> Result<PathBuf> {
        let local_path = absolutize(base_path, Path::new(path));
        if !local_path.is_dir() {
            return Err(PodforgeError::DependencySourceNotFound {
                path: local_path.display().to_string(),
            }
            .into());
        }
        Ok(local_path)
    }
}

impl SourceFetcher for DependencyDownloader {
    fn fetch<'a>(&'a self, request: FetchRequest<'a>) -> FetchFuture<'a> {
        Box::pin(self.download(request))
    }
}
