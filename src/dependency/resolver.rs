//! The traversal driver.
//!
//! Resolution runs in two phases:
//!
//! 1. **Descent**: walk the invoking project's declarations depth-first in
//!    declaration order. A declaration whose identity is already in the graph
//!    only gains an edge (after a cycle check); a new one is materialized,
//!    inserted and, unless `ignoreDependencies` is set, descended into.
//! 2. **Drain**: repeatedly remove the first leaf reachable from the root,
//!    which yields every dependency after all of its own dependencies.
//!
//! The invoking project's generated cache is written only after a fully
//! successful descent.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Dependency;
use super::download::{DependencyDownloader, SourceFetcher};
use super::factory::{ClientFactory, DefaultClientFactory};
use super::graph::{CyclicDependencyError, Graph, GraphError};
use super::identity::{dependency_id, root_id};
use super::materializer::Materializer;
use crate::config::{Config, ConfigOptions, DependencyConfig};
use crate::generated::{GeneratedConfig, GeneratedLoader};
use crate::kube::KubeClient;
use crate::utils::absolutize;

/// Resolves a project's dependency tree into deployment order.
pub struct Resolver {
    graph: Graph<Dependency>,
    root_id: String,
    base_path: PathBuf,
    base_config: Config,
    base_cache: GeneratedConfig,
    generated_saver: GeneratedLoader,
    config_options: ConfigOptions,
    allow_cyclic: bool,
    kube_client: Option<Arc<dyn KubeClient>>,
    fetcher: Arc<dyn SourceFetcher>,
    factory: Arc<dyn ClientFactory>,
}

/// Builder for [`Resolver`].
pub struct ResolverBuilder {
    base_config: Config,
    base_cache: GeneratedConfig,
    kube_client: Option<Arc<dyn KubeClient>>,
    allow_cyclic: bool,
    config_options: ConfigOptions,
    base_path: Option<PathBuf>,
    generated_saver: Option<GeneratedLoader>,
    fetcher: Option<Arc<dyn SourceFetcher>>,
    factory: Option<Arc<dyn ClientFactory>>,
}

impl ResolverBuilder {
    /// Cluster binding of the invoking project.
    #[must_use]
    pub fn kube_client(mut self, client: Option<Arc<dyn KubeClient>>) -> Self {
        self.kube_client = client;
        self
    }

    /// Tolerate cycles instead of failing on them.
    #[must_use]
    pub const fn allow_cyclic(mut self, allow: bool) -> Self {
        self.allow_cyclic = allow;
        self
    }

    #[must_use]
    pub fn config_options(mut self, options: ConfigOptions) -> Self {
        self.config_options = options;
        self
    }

    /// Directory of the invoking project, the working directory by default.
    #[must_use]
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Where the invoking project's generated cache is saved, by default
    /// `<base path>/.podforge/generated.yaml` under the selected profile.
    #[must_use]
    pub fn generated_saver(mut self, saver: GeneratedLoader) -> Self {
        self.generated_saver = Some(saver);
        self
    }

    #[must_use]
    pub fn fetcher(mut self, fetcher: Arc<dyn SourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    #[must_use]
    pub fn client_factory(mut self, factory: Arc<dyn ClientFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Computes the root identity and creates the resolver.
    ///
    /// # Errors
    ///
    /// Fails when the project directory cannot be turned into an identity.
    pub async fn build(self) -> Result<Resolver> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let base_path = match self.base_path {
            Some(path) => absolutize(&cwd, &path),
            None => cwd,
        };

        let root_id = root_id(&base_path)
            .await
            .with_context(|| format!("Failed to compute identity of {}", base_path.display()))?;
        tracing::debug!("Root identity: {}", root_id);

        let generated_saver = self.generated_saver.unwrap_or_else(|| {
            GeneratedLoader::new(&base_path, self.config_options.profile.clone().unwrap_or_default())
        });

        Ok(Resolver {
            graph: Graph::new(root_id.clone()),
            root_id,
            base_path,
            base_config: self.base_config,
            base_cache: self.base_cache,
            generated_saver,
            config_options: self.config_options,
            allow_cyclic: self.allow_cyclic,
            kube_client: self.kube_client,
            fetcher: self.fetcher.unwrap_or_else(|| Arc::new(DependencyDownloader::new())),
            factory: self.factory.unwrap_or_else(|| Arc::new(DefaultClientFactory::new())),
        })
    }
}

impl Resolver {
    /// Starts building a resolver for the project described by `base_config`
    /// whose generated cache is `base_cache`.
    #[must_use]
    pub fn builder(base_config: Config, base_cache: GeneratedConfig) -> ResolverBuilder {
        ResolverBuilder {
            base_config,
            base_cache,
            kube_client: None,
            allow_cyclic: false,
            config_options: ConfigOptions::default(),
            base_path: None,
            generated_saver: None,
            fetcher: None,
            factory: None,
        }
    }

    /// Identity of the invoking project.
    #[must_use]
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// The invoking project's generated cache, as updated by resolution.
    #[must_use]
    pub const fn base_cache(&self) -> &GeneratedConfig {
        &self.base_cache
    }

    /// Resolves all dependencies and returns them in deployment order.
    ///
    /// `update` refreshes existing git checkouts from their remotes.
    ///
    /// # Errors
    ///
    /// A cycle fails with [`CyclicDependencyError`] (reachable through
    /// `downcast_ref`) unless cycles are allowed. Any other failure while
    /// acquiring or loading a dependency aborts resolution; the generated
    /// cache is not written in either case.
    pub async fn resolve(&mut self, update: bool) -> Result<Vec<Dependency>> {
        self.graph = Graph::new(self.root_id.clone());

        let declarations = self.base_config.dependencies.clone();
        let base_path = self.base_path.clone();
        let root_id = self.root_id.clone();

        if let Err(err) = self.resolve_recursive(&base_path, &root_id, &declarations, update).await {
            if err.is::<CyclicDependencyError>() {
                return Err(err);
            }
            return Err(err.context("Failed to resolve dependencies"));
        }

        self.generated_saver.save(&self.base_cache).context("Failed to save generated cache")?;

        self.build_dependency_queue()
    }

    async fn resolve_recursive(
        &mut self,
        base_path: &Path,
        parent_id: &str,
        declarations: &[DependencyConfig],
        update: bool,
    ) -> Result<()> {
        for declaration in declarations {
            let id = dependency_id(base_path, &declaration.source, declaration.profile())?;

            if self.graph.contains(&id) {
                self.link_existing(parent_id, &id)?;
                continue;
            }

            let materializer = Materializer {
                fetcher: self.fetcher.as_ref(),
                factory: self.factory.as_ref(),
                config_options: &self.config_options,
                kube_client: self.kube_client.as_ref(),
            };
            let dependency = materializer
                .materialize(&id, base_path, declaration, &mut self.base_cache, update)
                .await?;

            let nested = if declaration.ignore_dependencies {
                Vec::new()
            } else {
                dependency.declared_dependencies().to_vec()
            };
            let local_path = dependency.local_path().to_path_buf();

            self.graph
                .insert_node_at(parent_id, id.clone(), dependency)
                .with_context(|| format!("Failed to add dependency {id} to the graph"))?;
            tracing::debug!("Resolved dependency {} (required by {})", id, parent_id);

            if !nested.is_empty() {
                Box::pin(self.resolve_recursive(&local_path, &id, &nested, update)).await?;
            }
        }
        Ok(())
    }

    /// Adds `parent -> id` for an already materialized dependency.
    fn link_existing(&mut self, parent_id: &str, id: &str) -> Result<()> {
        match self.graph.add_edge(parent_id, id) {
            Ok(()) => Ok(()),
            Err(GraphError::Cycle(cycle)) if self.allow_cyclic => {
                tracing::warn!("Ignoring cyclic dependency: {}", cycle.chain());
                Ok(())
            }
            Err(GraphError::Cycle(cycle)) => Err(cycle.into()),
            Err(other) => Err(anyhow::Error::new(other)
                .context(format!("Failed to link dependency {id} to {parent_id}"))),
        }
    }

    fn build_dependency_queue(&mut self) -> Result<Vec<Dependency>> {
        let mut queue = Vec::with_capacity(self.graph.len().saturating_sub(1));
        loop {
            let next = self.graph.next_leaf(&self.root_id);
            if next.is_root() {
                break;
            }
            let next = next.id().to_string();
            queue.push(self.graph.remove_node(&next)?);
        }
        Ok(queue)
    }
}
