//! Turning one dependency declaration into a [`Dependency`].

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use super::Dependency;
use super::download::{FetchRequest, SourceFetcher};
use super::factory::ClientFactory;
use crate::config::{ConfigLoader, ConfigOptions, DependencyConfig, DevConfig};
use crate::generated::{GeneratedConfig, GeneratedLoader};
use crate::kube::KubeClient;
use crate::utils::config_hash;

/// Everything a materialization needs besides the declaration itself.
pub(crate) struct Materializer<'a> {
    pub fetcher: &'a dyn SourceFetcher,
    pub factory: &'a dyn ClientFactory,
    /// Options of the invoking project; cloned per dependency
    pub config_options: &'a ConfigOptions,
    /// Cluster binding of the invoking project
    pub kube_client: Option<&'a Arc<dyn KubeClient>>,
}

impl Materializer<'_> {
    /// Acquires, loads and wires up the dependency `id` declared by the
    /// project at `base_path`.
    ///
    /// `base_cache` is the invoking project's generated cache. Its active
    /// scope seeds the dependency's variables, and on success records the
    /// dependency's configuration hash.
    pub async fn materialize(
        &self,
        id: &str,
        base_path: &Path,
        declaration: &DependencyConfig,
        base_cache: &mut GeneratedConfig,
        update: bool,
    ) -> Result<Dependency> {
        let local_path = self
            .fetcher
            .fetch(FetchRequest {
                id,
                base_path,
                source: &declaration.source,
                update,
            })
            .await
            .with_context(|| format!("Failed to download dependency {}", declaration.display_name()))?;

        let profile = declaration.profile().map(String::from);

        let mut options = self.config_options.clone();
        options.profile.clone_from(&profile);
        options.config_path = Some(local_path.join(declaration.source.config_file()));
        if let Some(base_scope) = base_cache.active() {
            for (name, value) in &base_scope.vars {
                options.vars.entry(name.clone()).or_insert_with(|| value.clone());
            }
        }

        let loader = ConfigLoader::new(options);
        let mut config = if profile.is_some() {
            loader.load()
        } else {
            loader.load_without_profile()
        }
        .with_context(|| format!("Failed to load config of dependency {id}"))?;

        let declared_dependencies = loader
            .parse_dependencies()
            .with_context(|| format!("Failed to read dependencies of dependency {id}"))?;

        let commands = loader
            .parse_commands()
            .with_context(|| format!("Failed to parse commands of dependency {id}"))?;

        config.dev = DevConfig::default();
        if declaration.skip_build {
            config.images.clear();
        }

        let generated_saver = GeneratedLoader::new(&local_path, profile.clone().unwrap_or_default());
        let mut generated = generated_saver
            .load()
            .with_context(|| format!("Failed to load generated cache of dependency {id}"))?;
        generated.seed_from(base_cache);

        let kube_client = self.bind_kube_client(id, declaration)?;

        let docker = self
            .factory
            .new_docker_client()
            .with_context(|| format!("Failed to create docker client for dependency {id}"))?;
        let registry_client = self.factory.new_registry_client(&config, kube_client.clone(), docker);

        let scope = generated.active().cloned().unwrap_or_default();
        let build_controller = self.factory.new_build_controller(&config, &scope, kube_client.clone());
        let deploy_controller = self.factory.new_deploy_controller(&config, &scope, kube_client.clone());

        let hash = config_hash(&config)?;
        base_cache.get_active().dependencies.insert(id.to_string(), hash);

        tracing::debug!("Materialized dependency {} at {}", id, local_path.display());

        Ok(Dependency {
            id: id.to_string(),
            local_path,
            config,
            commands,
            declared_dependencies,
            declaration: declaration.clone(),
            generated,
            generated_saver,
            kube_client,
            registry_client,
            build_controller,
            deploy_controller,
        })
    }

    /// The invoking project's binding, or a new one when the declaration
    /// targets a different namespace. The kube context is kept either way.
    fn bind_kube_client(
        &self,
        id: &str,
        declaration: &DependencyConfig,
    ) -> Result<Option<Arc<dyn KubeClient>>> {
        let current = self.kube_client.cloned();
        let Some(namespace) = declaration.namespace() else {
            return Ok(current);
        };
        if current.as_ref().is_some_and(|c| c.namespace() == namespace) {
            return Ok(current);
        }

        let context = current.as_ref().map(|c| c.current_context().to_string());
        tracing::debug!(
            "Dependency {} uses namespace {} (context {})",
            id,
            namespace,
            context.as_deref().unwrap_or("<current>")
        );
        let client = self
            .factory
            .new_kube_client(context.as_deref(), namespace)
            .with_context(|| format!("Failed to create kube client for dependency {id}"))?;
        Ok(Some(client))
    }
}
