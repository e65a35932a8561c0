//! Loading the invoking project for CLI commands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ProjectArgs;
use crate::config::{Config, ConfigLoader, ConfigOptions, DEFAULT_CONFIG_PATH};
use crate::dependency::{Dependency, Resolver};
use crate::generated::{GeneratedConfig, GeneratedLoader};
use crate::kube::{KubeClient, KubeConfigClient, KubeConfigLoader};
use crate::utils::absolutize;

/// The invoking project: configuration, generated cache and cluster binding.
pub struct ProjectContext {
    pub project_dir: PathBuf,
    pub options: ConfigOptions,
    pub config: Config,
    pub generated: GeneratedConfig,
    pub kube_client: Option<Arc<dyn KubeClient>>,
}

impl ProjectContext {
    /// Loads the project selected by `args` relative to the working directory.
    pub fn load(args: &ProjectArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        Self::load_from(&cwd, args)
    }

    /// Loads the project selected by `args` relative to `cwd`.
    pub fn load_from(cwd: &Path, args: &ProjectArgs) -> Result<Self> {
        let config_path = absolutize(
            cwd,
            args.config.as_deref().unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH)),
        );
        let project_dir = config_path.parent().map_or_else(|| cwd.to_path_buf(), Path::to_path_buf);
        let profile = args.profile.clone().filter(|p| !p.trim().is_empty());

        let options = ConfigOptions {
            profile: profile.clone(),
            config_path: Some(config_path.clone()),
            kube_context: args.kube_context.clone(),
            namespace: args.namespace.clone(),
            vars: args.vars.iter().cloned().collect(),
        };

        let config = ConfigLoader::new(options.clone())
            .load()
            .with_context(|| format!("Failed to load {}", config_path.display()))?;

        let generated = GeneratedLoader::new(&project_dir, profile.unwrap_or_default()).load()?;
        let kube_client = Self::bind_kube_client(args)?;

        Ok(Self {
            project_dir,
            options,
            config,
            generated,
            kube_client,
        })
    }

    /// The cluster binding from the kubeconfig. Without an explicit context or
    /// namespace a missing kubeconfig is not an error: the project is simply
    /// not bound to a cluster.
    fn bind_kube_client(args: &ProjectArgs) -> Result<Option<Arc<dyn KubeClient>>> {
        let explicit = args.kube_context.is_some() || args.namespace.is_some();
        match KubeConfigClient::load(
            &KubeConfigLoader::default(),
            args.kube_context.as_deref(),
            args.namespace.as_deref(),
        ) {
            Ok(client) => Ok(Some(Arc::new(client))),
            Err(e) if explicit => Err(e),
            Err(e) => {
                tracing::debug!("No kube context available: {:#}", e);
                Ok(None)
            }
        }
    }

    /// Creates a resolver for this project.
    pub async fn into_resolver(self, allow_cyclic: bool) -> Result<Resolver> {
        Resolver::builder(self.config, self.generated)
            .base_path(self.project_dir)
            .config_options(self.options)
            .kube_client(self.kube_client)
            .allow_cyclic(allow_cyclic)
            .build()
            .await
    }
}

/// Machine-readable view of a resolved dependency.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DependencySummary {
    pub id: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub images: Vec<String>,
    pub images_to_build: Vec<String>,
    pub deployments: Vec<String>,
    pub registries: Vec<String>,
    pub commands: Vec<String>,
}

impl From<&Dependency> for DependencySummary {
    fn from(dependency: &Dependency) -> Self {
        Self {
            id: dependency.id().to_string(),
            path: dependency.local_path().display().to_string(),
            profile: dependency.profile().map(String::from),
            namespace: dependency.kube_client().map(|c| c.namespace().to_string()),
            images: dependency.build_controller().images(),
            images_to_build: dependency.build_controller().images_to_build(),
            deployments: dependency.deploy_controller().deployments(),
            registries: dependency.registry_client().registries(),
            commands: dependency.commands().iter().map(|c| c.name.clone()).collect(),
        }
    }
}

/// Resolution result as printed by `--output json`.
#[derive(Debug, Serialize)]
pub(crate) struct ResolutionReport {
    pub root: String,
    pub dependencies: Vec<DependencySummary>,
}
