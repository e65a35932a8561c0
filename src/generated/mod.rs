//! The generated cache: `.podforge/generated.yaml`.
//!
//! Build and deploy bookkeeping that podforge writes back to a project between
//! runs. The file holds one [`CacheConfig`] scope per profile; the scope of the
//! profile currently in use is the *active* one. Profile-less runs use the
//! scope named [`DEFAULT_PROFILE`].
//!
//! ```yaml
//! activeProfile: staging
//! profiles:
//!   staging:
//!     images:
//!       api:
//!         imageConfigHash: 5f2c...
//!         tag: a1b2c3
//!     dependencies:
//!       github.com/acme/db@main: 9e1d...
//!     vars:
//!       REGISTRY: registry.acme.io
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::GENERATED_CONFIG_PATH;
use crate::core::PodforgeError;
use crate::utils::atomic_write;

/// Scope name used when no profile is selected.
pub const DEFAULT_PROFILE: &str = "default";

/// Contents of a project's generated cache file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub active_profile: String,

    #[serde(default)]
    pub profiles: BTreeMap<String, CacheConfig>,
}

/// The cache scope of one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, ImageCache>,

    /// Dependency identity to the hash of the configuration it was loaded with
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_context: Option<LastContext>,

    /// Variable values remembered between runs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

/// What was last built for an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCache {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_config_hash: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dockerfile_hash: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_hash: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
}

/// The kube context and namespace of the last deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastContext {
    pub context: String,
    pub namespace: String,
}

fn scope_name(profile: &str) -> &str {
    let profile = profile.trim();
    if profile.is_empty() {
        DEFAULT_PROFILE
    } else {
        profile
    }
}

impl GeneratedConfig {
    /// Ensures a scope exists for `profile`.
    pub fn init_profile(&mut self, profile: &str) {
        self.profiles.entry(scope_name(profile).to_string()).or_default();
    }

    /// The active scope, created on first access.
    pub fn get_active(&mut self) -> &mut CacheConfig {
        let name = scope_name(&self.active_profile).to_string();
        self.profiles.entry(name).or_default()
    }

    /// The active scope, if it exists yet.
    #[must_use]
    pub fn active(&self) -> Option<&CacheConfig> {
        self.profiles.get(scope_name(&self.active_profile))
    }

    /// Copies variables from `base`'s active scope that this cache's active
    /// scope does not define yet.
    pub fn seed_from(&mut self, base: &Self) {
        let Some(base_scope) = base.active() else {
            return;
        };
        let scope = self.get_active();
        for (name, value) in &base_scope.vars {
            scope.vars.entry(name.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// Loads and saves one project's generated cache for one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLoader {
    path: PathBuf,
    profile: String,
}

impl GeneratedLoader {
    /// Loader for the generated cache of the project rooted at `project_dir`.
    pub fn new(project_dir: &Path, profile: impl Into<String>) -> Self {
        Self {
            path: project_dir.join(GENERATED_CONFIG_PATH),
            profile: profile.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Loads the cache with this loader's profile active.
    ///
    /// A missing file yields a fresh cache.
    pub fn load(&self) -> Result<GeneratedConfig> {
        let mut config = self.load_from_path(&self.path)?;
        config.active_profile.clone_from(&self.profile);
        config.init_profile(&self.profile);
        Ok(config)
    }

    /// Parses the cache at `path` as written.
    pub fn load_from_path(&self, path: &Path) -> Result<GeneratedConfig> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!("No generated cache at {}, starting fresh", path.display());
                return Ok(GeneratedConfig::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read generated cache {}", path.display()));
            }
        };

        if raw.trim().is_empty() {
            return Ok(GeneratedConfig::default());
        }

        serde_yaml::from_str(&raw).map_err(|e| {
            PodforgeError::ConfigParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Writes `config` to this loader's path.
    pub fn save(&self, config: &GeneratedConfig) -> Result<()> {
        let yaml = serde_yaml::to_string(config).context("Failed to serialize generated cache")?;
        atomic_write(&self.path, yaml.as_bytes())
            .with_context(|| format!("Failed to save generated cache {}", self.path.display()))?;
        tracing::debug!("Saved generated cache to {}", self.path.display());
        Ok(())
    }
}
