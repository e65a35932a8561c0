//! Construction of the per-dependency collaborators.
//!
//! The resolver never builds clients or controllers directly; it asks a
//! [`ClientFactory`]. Tests substitute a factory that records what was
//! requested instead of reading the user's kubeconfig.

use anyhow::Result;
use std::sync::Arc;

use crate::build::{BuildController, ImageBuildController};
use crate::config::Config;
use crate::deploy::{DeployController, ManifestDeployController};
use crate::docker::{DockerCli, DockerClient};
use crate::generated::CacheConfig;
use crate::kube::{KubeClient, KubeConfigClient, KubeConfigLoader};
use crate::pullsecrets::{PullSecretClient, RegistryClient};

/// Creates clients and controllers for a materialized dependency.
pub trait ClientFactory: Send + Sync {
    /// Binds to `namespace` through `context` (the kubeconfig's current
    /// context when `None`).
    fn new_kube_client(&self, context: Option<&str>, namespace: &str) -> Result<Arc<dyn KubeClient>>;

    fn new_docker_client(&self) -> Result<Arc<dyn DockerClient>>;

    fn new_registry_client(
        &self,
        config: &Config,
        kube_client: Option<Arc<dyn KubeClient>>,
        docker: Arc<dyn DockerClient>,
    ) -> Box<dyn RegistryClient>;

    fn new_build_controller(
        &self,
        config: &Config,
        cache: &CacheConfig,
        kube_client: Option<Arc<dyn KubeClient>>,
    ) -> Box<dyn BuildController>;

    fn new_deploy_controller(
        &self,
        config: &Config,
        cache: &CacheConfig,
        kube_client: Option<Arc<dyn KubeClient>>,
    ) -> Box<dyn DeployController>;
}

/// Factory producing the real kubeconfig, docker and controller types.
#[derive(Debug, Clone, Default)]
pub struct DefaultClientFactory {
    kubeconfig: KubeConfigLoader,
}

impl DefaultClientFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads kube contexts through `loader` instead of the default location.
    pub const fn with_kubeconfig(loader: KubeConfigLoader) -> Self {
        Self {
            kubeconfig: loader,
        }
    }
}

impl ClientFactory for DefaultClientFactory {
    fn new_kube_client(&self, context: Option<&str>, namespace: &str) -> Result<Arc<dyn KubeClient>> {
        let client = KubeConfigClient::load(&self.kubeconfig, context, Some(namespace))?;
        Ok(Arc::new(client))
    }

    fn new_docker_client(&self) -> Result<Arc<dyn DockerClient>> {
        Ok(Arc::new(DockerCli::new()))
    }

    fn new_registry_client(
        &self,
        config: &Config,
        kube_client: Option<Arc<dyn KubeClient>>,
        docker: Arc<dyn DockerClient>,
    ) -> Box<dyn RegistryClient> {
        Box::new(PullSecretClient::new(config, kube_client, docker))
    }

    fn new_build_controller(
        &self,
        config: &Config,
        cache: &CacheConfig,
        kube_client: Option<Arc<dyn KubeClient>>,
    ) -> Box<dyn BuildController> {
        Box::new(ImageBuildController::new(config, cache, kube_client))
    }

    fn new_deploy_controller(
        &self,
        config: &Config,
        cache: &CacheConfig,
        kube_client: Option<Arc<dyn KubeClient>>,
    ) -> Box<dyn DeployController> {
        Box::new(ManifestDeployController::new(config, cache, kube_client))
    }
}
