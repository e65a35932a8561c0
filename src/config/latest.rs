//! Schema of `podforge.yaml`.
//!
//! Keys are camelCase on disk. Sections podforge does not interpret itself
//! (development-session settings, chart values) are kept as raw YAML values so
//! round-tripping a file never loses information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use super::DEFAULT_CONFIG_PATH;
use crate::git::strip_auth_from_url;
use crate::utils::normalize_path;

fn default_version() -> String {
    "v1".to_string()
}

/// A parsed project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, ImageConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deployments: Vec<DeploymentConfig>,

    #[serde(default, skip_serializing_if = "DevConfig::is_empty")]
    pub dev: DevConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<DependencyConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<ProfileConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            images: BTreeMap::new(),
            deployments: Vec::new(),
            dev: DevConfig::default(),
            dependencies: Vec::new(),
            commands: Vec::new(),
            profiles: Vec::new(),
        }
    }
}

impl Config {
    /// Looks up a profile by name.
    #[must_use]
    pub fn profile(&self, name: &str) -> Option<&ProfileConfig> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

/// An image podforge builds and pushes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    /// Full image name, optionally including a registry host
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_push: bool,
}

/// A deployment rolled out by the deploy controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubectl: Option<KubectlConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm: Option<HelmConfig>,
}

/// Plain manifests applied with kubectl.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubectlConfig {
    #[serde(default)]
    pub manifests: Vec<String>,
}

/// A helm chart release.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelmConfig {
    pub chart: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<serde_yaml::Value>,
}

/// Development-session settings (port forwarding, file sync, ...).
///
/// Never used for dependencies: only the invoking project runs a dev session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync: Vec<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replace_pods: Vec<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_reload: Option<serde_yaml::Value>,
}

impl DevConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
            && self.sync.is_empty()
            && self.replace_pods.is_empty()
            && self.terminal.is_none()
            && self.auto_reload.is_none()
    }
}

/// A dependency declaration: another project this one needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyConfig {
    /// Informational label, not part of the dependency's identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub source: SourceConfig,

    /// Profile to load the dependency's configuration with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Drop the dependency's image definitions
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip_build: bool,

    /// Do not follow the dependency's own declarations
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ignore_dependencies: bool,

    /// Namespace the dependency is deployed into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl DependencyConfig {
    /// The selected profile, treating an empty string as unset.
    #[must_use]
    pub fn profile(&self) -> Option<&str> {
        non_empty(self.profile.as_deref())
    }

    /// The target namespace, treating an empty string as unset.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        non_empty(self.namespace.as_deref())
    }

    /// Label for log lines and errors: the declared name with its source, else
    /// the source alone.
    #[must_use]
    pub fn display_name(&self) -> String {
        match non_empty(self.name.as_deref()) {
            Some(name) => format!("{name} ({})", self.source),
            None => self.source.to_string(),
        }
    }
}

/// Where a dependency lives: a git repository or a local directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Directory inside the repository holding the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Configuration file name inside the project, `podforge.yaml` by default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_name: Option<String>,
}

impl SourceConfig {
    #[must_use]
    pub fn git(&self) -> Option<&str> {
        non_empty(self.git.as_deref())
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        non_empty(self.path.as_deref())
    }

    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        non_empty(self.branch.as_deref())
    }

    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        non_empty(self.tag.as_deref())
    }

    #[must_use]
    pub fn revision(&self) -> Option<&str> {
        non_empty(self.revision.as_deref())
    }

    #[must_use]
    pub fn sub_path(&self) -> Option<&str> {
        non_empty(self.sub_path.as_deref())
    }

    /// The configured file name relative to the source directory, or `None`
    /// when it names the default file.
    ///
    /// `./podforge.yaml`, `podforge.yaml` and `sub/../podforge.yaml` are the
    /// same file and all yield `None`.
    #[must_use]
    pub fn config_name(&self) -> Option<String> {
        let name = non_empty(self.config_name.as_deref())?;
        let unified = name.replace('\\', "/");
        let normalized = normalize_path(Path::new(unified.trim_start_matches('/')));
        let normalized = normalized.to_string_lossy().replace('\\', "/").trim_matches('/').to_string();
        Some(normalized).filter(|n| !n.is_empty() && n != DEFAULT_CONFIG_PATH)
    }

    /// The config file to load from the source directory.
    #[must_use]
    pub fn config_file(&self) -> String {
        self.config_name().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
    }
}

impl fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(git) = self.git() {
            write!(f, "git {}", strip_auth_from_url(git))?;
            if let Some(branch) = self.branch() {
                write!(f, " (branch {branch})")?;
            } else if let Some(tag) = self.tag() {
                write!(f, " (tag {tag})")?;
            } else if let Some(revision) = self.revision() {
                write!(f, " (revision {revision})")?;
            }
            if let Some(sub_path) = self.sub_path() {
                write!(f, " subPath {sub_path}")?;
            }
            Ok(())
        } else if let Some(path) = self.path() {
            write!(f, "path {path}")
        } else {
            write!(f, "<empty source>")
        }
    }
}

/// A named project command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfig {
    pub name: String,
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A named profile. Applying it replaces whole top-level sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileConfig {
    pub name: String,

    /// Profile applied before this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<ProfileReplace>,
}

/// Sections a profile replaces. Unset sections are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileReplace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<BTreeMap<String, ImageConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployments: Option<Vec<DeploymentConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev: Option<DevConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<DependencyConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<CommandConfig>>,
}

impl ProfileReplace {
    pub(crate) fn apply(&self, config: &mut Config) {
        if let Some(images) = &self.images {
            config.images.clone_from(images);
        }
        if let Some(deployments) = &self.deployments {
            config.deployments.clone_from(deployments);
        }
        if let Some(dev) = &self.dev {
            config.dev.clone_from(dev);
        }
        if let Some(dependencies) = &self.dependencies {
            config.dependencies.clone_from(dependencies);
        }
        if let Some(commands) = &self.commands {
            config.commands.clone_from(commands);
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
