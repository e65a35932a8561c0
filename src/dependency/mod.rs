//! Dependency resolution.
//!
//! A project's `podforge.yaml` can declare other projects (local directories
//! or git repositories) as dependencies, and those can declare their own. The
//! [`Resolver`] walks these declarations depth-first, acquires and loads every
//! distinct dependency exactly once, rejects (or, when allowed, tolerates)
//! cycles, and returns the dependencies in deployment order: every dependency
//! after all of its own dependencies.
//!
//! # Modules
//!
//! - [`graph`] - identity-keyed graph store with cycle-checked edges
//! - [`identity`] - canonical identities for sources
//! - [`download`] - source acquisition ([`SourceFetcher`])
//! - [`factory`] - construction of clients and controllers ([`ClientFactory`])
//! - `materializer` - turns one declaration into a [`Dependency`]
//! - [`resolver`] - the traversal driver
//!
//! # Example
//!
//! ```rust,no_run
//! use podforge::config::{ConfigLoader, ConfigOptions};
//! use podforge::dependency::Resolver;
//! use podforge::generated::GeneratedLoader;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = ConfigOptions::default();
//! let config = ConfigLoader::new(options.clone()).load()?;
//! let cache = GeneratedLoader::new(std::path::Path::new("."), "").load()?;
//!
//! let mut resolver = Resolver::builder(config, cache).config_options(options).build().await?;
//! for dependency in resolver.resolve(false).await? {
//!     println!("{} -> {}", dependency.id(), dependency.local_path().display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod download;
pub mod factory;
pub mod graph;
pub mod identity;
pub mod lock;
mod materializer;
pub mod resolver;

pub use download::{DependencyDownloader, FetchFuture, FetchRequest, SourceFetcher};
pub use factory::{ClientFactory, DefaultClientFactory};
pub use graph::{CyclicDependencyError, Graph, GraphError, Node, NodePayload};
pub use identity::{dependency_id, normalize_git_url};
pub use resolver::{Resolver, ResolverBuilder};

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::build::BuildController;
use crate::config::{CommandConfig, Config, DependencyConfig};
use crate::deploy::DeployController;
use crate::generated::{GeneratedConfig, GeneratedLoader};
use crate::kube::KubeClient;
use crate::pullsecrets::RegistryClient;

/// A fully materialized dependency, ready for the build and deploy pipeline.
#[derive(Debug)]
pub struct Dependency {
    pub(crate) id: String,
    pub(crate) local_path: PathBuf,
    pub(crate) config: Config,
    pub(crate) commands: Vec<CommandConfig>,
    pub(crate) declared_dependencies: Vec<DependencyConfig>,
    pub(crate) declaration: DependencyConfig,
    pub(crate) generated: GeneratedConfig,
    pub(crate) generated_saver: GeneratedLoader,
    pub(crate) kube_client: Option<Arc<dyn KubeClient>>,
    pub(crate) registry_client: Box<dyn RegistryClient>,
    pub(crate) build_controller: Box<dyn BuildController>,
    pub(crate) deploy_controller: Box<dyn DeployController>,
}

impl Dependency {
    /// The dependency's identity (see [`identity`]).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Directory holding the dependency's project.
    #[must_use]
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Loaded configuration with development settings removed and, for
    /// `skipBuild` declarations, images removed.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn commands(&self) -> &[CommandConfig] {
        &self.commands
    }

    /// The dependency's own dependency declarations.
    #[must_use]
    pub fn declared_dependencies(&self) -> &[DependencyConfig] {
        &self.declared_dependencies
    }

    /// The declaration this dependency was first materialized from.
    #[must_use]
    pub const fn declaration(&self) -> &DependencyConfig {
        &self.declaration
    }

    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        self.declaration.profile()
    }

    /// The dependency's own generated cache.
    #[must_use]
    pub const fn generated(&self) -> &GeneratedConfig {
        &self.generated
    }

    pub fn generated_mut(&mut self) -> &mut GeneratedConfig {
        &mut self.generated
    }

    /// Writes the dependency's generated cache back to its project.
    pub fn save_generated(&self) -> Result<()> {
        self.generated_saver.save(&self.generated)
    }

    /// Cluster binding, `None` when neither the invoking project nor the
    /// declaration provides one.
    #[must_use]
    pub fn kube_client(&self) -> Option<&Arc<dyn KubeClient>> {
        self.kube_client.as_ref()
    }

    #[must_use]
    pub fn registry_client(&self) -> &dyn RegistryClient {
        self.registry_client.as_ref()
    }

    #[must_use]
    pub fn build_controller(&self) -> &dyn BuildController {
        self.build_controller.as_ref()
    }

    #[must_use]
    pub fn deploy_controller(&self) -> &dyn DeployController {
        self.deploy_controller.as_ref()
    }
}
