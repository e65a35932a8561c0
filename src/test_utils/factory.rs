//! A [`ClientFactory`] that records what it was asked for.

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::build::{BuildController, ImageBuildController};
use crate::config::Config;
use crate::deploy::{DeployController, ManifestDeployController};
use crate::dependency::ClientFactory;
use crate::docker::{DockerCli, DockerClient};
use crate::generated::CacheConfig;
use crate::kube::{KubeClient, KubeConfigClient};
use crate::pullsecrets::{PullSecretClient, RegistryClient};

/// Context used for kube clients requested without one.
pub const TEST_CONTEXT: &str = "test-context";

/// Records kube client requests and counts docker clients (one per
/// materialized dependency). Never touches a kubeconfig or `PATH`.
#[derive(Debug, Default)]
pub struct RecordingClientFactory {
    docker_clients: AtomicUsize,
    kube_requests: Mutex<Vec<(Option<String>, String)>>,
}

impl RecordingClientFactory {
    /// Number of docker clients created.
    pub fn docker_clients(&self) -> usize {
        self.docker_clients.load(Ordering::SeqCst)
    }

    /// `(context, namespace)` of every kube client requested.
    pub fn kube_requests(&self) -> Vec<(Option<String>, String)> {
        self.kube_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl ClientFactory for RecordingClientFactory {
    fn new_kube_client(&self, context: Option<&str>, namespace: &str) -> Result<Arc<dyn KubeClient>> {
        if let Ok(mut requests) = self.kube_requests.lock() {
            requests.push((context.map(String::from), namespace.to_string()));
        }
        Ok(Arc::new(KubeConfigClient::from_parts(context.unwrap_or(TEST_CONTEXT), namespace)))
    }

    fn new_docker_client(&self) -> Result<Arc<dyn DockerClient>> {
        self.docker_clients.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(DockerCli::default()))
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
