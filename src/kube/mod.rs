//! Kubernetes client binding.
//!
//! podforge does not talk to the API server while resolving dependencies; a
//! client here is the *binding* a project deploys through: a kube context
//! plus a namespace, read from the user's kubeconfig.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::PodforgeError;
use crate::utils::platform::get_home_dir;

/// Namespace used when neither the caller nor the context names one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// A context/namespace binding to a cluster.
pub trait KubeClient: fmt::Debug + Send + Sync {
    /// Name of the kube context in use.
    fn current_context(&self) -> &str;

    /// Namespace deployments go to.
    fn namespace(&self) -> &str;

    /// API server of the context's cluster, when known.
    fn server(&self) -> Option<&str> {
        None
    }
}

/// The subset of a kubeconfig file podforge reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KubeConfig {
    #[serde(default)]
    pub current_context: String,

    #[serde(default)]
    pub contexts: Vec<NamedContext>,

    #[serde(default)]
    pub clusters: Vec<NamedCluster>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedContext {
    pub name: String,
    #[serde(default)]
    pub context: ContextSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContextSpec {
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default)]
    pub cluster: ClusterSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub server: Option<String>,
}

impl KubeConfig {
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&ContextSpec> {
        self.contexts.iter().find(|c| c.name == name).map(|c| &c.context)
    }

    #[must_use]
    pub fn cluster(&self, name: &str) -> Option<&ClusterSpec> {
        self.clusters.iter().find(|c| c.name == name).map(|c| &c.cluster)
    }
}

/// Locates and reads the kubeconfig.
#[derive(Debug, Clone, Default)]
pub struct KubeConfigLoader {
    path: Option<PathBuf>,
}

impl KubeConfigLoader {
    /// Loader for an explicit kubeconfig file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The kubeconfig path: explicit, else the first `KUBECONFIG` entry, else
    /// `~/.kube/config`.
    pub fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Some(value) = std::env::var_os("KUBECONFIG") {
            if let Some(first) = std::env::split_paths(&value).find(|p| !p.as_os_str().is_empty()) {
                return Ok(first);
            }
        }
        Ok(get_home_dir()?.join(".kube").join("config"))
    }

    pub fn load(&self) -> Result<KubeConfig> {
        let path = self.path()?;
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<KubeConfig> {
        let raw = std::fs::read_to_string(path).map_err(|e| PodforgeError::KubeConfigError {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        serde_yaml::from_str(&raw).map_err(|e| {
            PodforgeError::KubeConfigError {
                reason: format!("invalid kubeconfig {}: {e}", path.display()),
            }
            .into()
        })
    }
}

/// [`KubeClient`] backed by a kubeconfig context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeConfigClient {
    context: String,
    namespace: String,
    server: Option<String>,
}

impl KubeConfigClient {
    /// Binds to `context` (the kubeconfig's current context when `None`) and
    /// `namespace` (the context's namespace when `None`).
    pub fn from_config(
        config: &KubeConfig,
        context: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Self> {
        let context = context
            .filter(|c| !c.is_empty())
            .unwrap_or(config.current_context.as_str())
            .to_string();
        if context.is_empty() {
            return Err(PodforgeError::KubeConfigError {
                reason: "no current context is set".to_string(),
            }
            .into());
        }

        let spec = config.context(&context).ok_or_else(|| PodforgeError::KubeConfigError {
            reason: format!("context '{context}' does not exist"),
        })?;

        let namespace = namespace
            .filter(|n| !n.is_empty())
            .map(String::from)
            .or_else(|| spec.namespace.clone().filter(|n| !n.is_empty()))
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let server = config.cluster(&spec.cluster).and_then(|c| c.server.clone());

        Ok(Self {
            context,
            namespace,
            server,
        })
    }

    /// Reads the kubeconfig through `loader` and binds to it.
    pub fn load(
        loader: &KubeConfigLoader,
        context: Option<&str>,
        namespace: Option<&str>,
    ) -> Result<Self> {
        let config = loader.load()?;
        Self::from_config(&config, context, namespace).with_context(|| {
            format!(
                "Failed to create kube client for namespace {}",
                namespace.unwrap_or("<default>")
            )
        })
    }

    /// A binding that is not backed by any kubeconfig.
    pub fn from_parts(context: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            namespace: namespace.into(),
            server: None,
        }
    }
}

impl KubeClient for KubeConfigClient {
    fn current_context(&self) -> &str {
        &self.context
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }
}
