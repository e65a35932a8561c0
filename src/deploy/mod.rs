//! Deployment controller.

use std::fmt;
use std::sync::Arc;

use crate::config::{Config, DeploymentConfig};
use crate::generated::{CacheConfig, LastContext};
use crate::kube::{DEFAULT_NAMESPACE, KubeClient};

/// Rolls out a project's deployments.
pub trait DeployController: fmt::Debug + Send + Sync {
    /// Deployment names in declaration order.
    fn deployments(&self) -> Vec<String>;

    /// Namespace `deployment` is rolled out to, `None` for unknown names.
    fn target_namespace(&self, deployment: &str) -> Option<String>;

    /// Whether the cluster binding differs from the one of the last
    /// deployment recorded in the cache.
    fn context_changed(&self) -> bool;
}

/// [`DeployController`] for kubectl and helm deployments.
#[derive(Debug, Clone)]
pub struct ManifestDeployController {
    deployments: Vec<DeploymentConfig>,
    last_context: Option<LastContext>,
    kube_client: Option<Arc<dyn KubeClient>>,
}

impl ManifestDeployController {
    pub fn new(config: &Config, cache: &CacheConfig, kube_client: Option<Arc<dyn KubeClient>>) -> Self {
        Self {
            deployments: config.deployments.clone(),
            last_context: cache.last_context.clone(),
            kube_client,
        }
    }
}

impl DeployController for ManifestDeployController {
    fn deployments(&self) -> Vec<String> {
        self.deployments.iter().map(|d| d.name.clone()).collect()
    }

    fn target_namespace(&self, deployment: &str) -> Option<String> {
        let deployment = self.deployments.iter().find(|d| d.name == deployment)?;
        let namespace = deployment
            .namespace
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| self.kube_client.as_ref().map(|c| c.namespace().to_string()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        Some(namespace)
    }

    fn context_changed(&self) -> bool {
        match (&self.last_context, &self.kube_client) {
            (Some(last), Some(client)) => {
                last.context != client.current_context() || last.namespace != client.namespace()
            }
            (None, _) => false,
            (Some(_), None) => true,
        }
    }
}
