//! Image registry client: the registries a project pushes to and pulls from,
//! for which pull secrets have to exist in the target namespace.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::docker::DockerClient;
use crate::kube::KubeClient;

/// Registry used for image names without a registry host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Registry access for one project.
pub trait RegistryClient: fmt::Debug + Send + Sync {
    /// Registry hosts referenced by the project's images, sorted.
    fn registries(&self) -> Vec<String>;

    /// Namespace pull secrets are created in, when bound to a cluster.
    fn namespace(&self) -> Option<&str>;
}

/// [`RegistryClient`] creating pull secrets from the local docker login.
#[derive(Debug, Clone)]
pub struct PullSecretClient {
    registries: BTreeSet<String>,
    kube_client: Option<Arc<dyn KubeClient>>,
    docker: Arc<dyn DockerClient>,
}

impl PullSecretClient {
    pub fn new(
        config: &Config,
        kube_client: Option<Arc<dyn KubeClient>>,
        docker: Arc<dyn DockerClient>,
    ) -> Self {
        let registries = config.images.values().map(|i| registry_from_image(&i.image)).collect();
        Self {
            registries,
            kube_client,
            docker,
        }
    }

    /// The container engine whose credentials back the secrets.
    #[must_use]
    pub fn docker(&self) -> &Arc<dyn DockerClient> {
        &self.docker
    }
}

impl RegistryClient for PullSecretClient {
    fn registries(&self) -> Vec<String> {
        self.registries.iter().cloned().collect()
    }

    fn namespace(&self) -> Option<&str> {
        self.kube_client.as_ref().map(|c| c.namespace())
    }
}

/// Registry host of an image name.
///
/// The first path segment is a registry when it looks like a host (contains a
/// dot or a port, or is `localhost`); otherwise the image lives on Docker Hub.
#[must_use]
pub fn registry_from_image(image: &str) -> String {
    match image.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => {
            first.to_ascii_lowercase()
        }
        _ => DEFAULT_REGISTRY.to_string(),
    }
}
