//! Reading `podforge.yaml` from disk.
//!
//! Loading is three steps: read the file, substitute `${VAR}` references
//! (explicit variables first, then the process environment; unknown names are
//! left as written), parse the YAML. Profile-aware loads then apply the
//! selected profile and its parent chain, oldest ancestor first.

use anyhow::Result;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::{CommandConfig, Config, DEFAULT_CONFIG_PATH, DependencyConfig};
use crate::core::{FileOperation, FileResultExt, PodforgeError};

/// Options controlling how a configuration is located and loaded.
///
/// Cloned and adjusted per dependency: each dependency gets its own profile
/// and configuration path while keeping the invoking project's variables.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Profile applied by [`ConfigLoader::load`]
    pub profile: Option<String>,
    /// Configuration file, `podforge.yaml` in the working directory by default
    pub config_path: Option<PathBuf>,
    /// Kube context to use instead of the kubeconfig's current one
    pub kube_context: Option<String>,
    /// Namespace to use instead of the context's default
    pub namespace: Option<String>,
    /// Variables substituted before the environment is consulted
    pub vars: BTreeMap<String, String>,
}

/// Loads one configuration file according to [`ConfigOptions`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    options: ConfigOptions,
}

impl ConfigLoader {
    pub const fn new(options: ConfigOptions) -> Self {
        Self {
            options,
        }
    }

    /// Path of the configuration file this loader reads.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.options.config_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Whether the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.config_path().is_file()
    }

    /// Loads the configuration with the selected profile applied.
    pub fn load(&self) -> Result<Config> {
        let path = self.config_path();
        let mut config = self.parse(&path)?;
        if let Some(profile) = self.selected_profile() {
            apply_profile(&mut config, profile, &path)?;
        }
        Ok(config)
    }

    /// Loads the configuration as written, ignoring any selected profile.
    pub fn load_without_profile(&self) -> Result<Config> {
        self.parse(&self.config_path())
    }

    /// Reads the project's commands, respecting the selected profile.
    pub fn parse_commands(&self) -> Result<Vec<CommandConfig>> {
        Ok(self.load()?.commands)
    }

    /// Reads the project's dependency declarations, respecting the selected
    /// profile.
    pub fn parse_dependencies(&self) -> Result<Vec<DependencyConfig>> {
        Ok(self.load()?.dependencies)
    }

    fn selected_profile(&self) -> Option<&str> {
        self.options.profile.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    fn parse(&self, path: &Path) -> Result<Config> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PodforgeError::ConfigNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => Err(e).with_file_context(
                FileOperation::Read,
                path,
                "reading project configuration",
                "config::loader",
            )?,
        };

        let expanded = self.substitute_variables(&raw);
        let config: Config =
            serde_yaml::from_str(&expanded).map_err(|e| PodforgeError::ConfigParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn substitute_variables(&self, raw: &str) -> String {
        shellexpand::env_with_context_no_errors(raw, |name: &str| {
            self.options.vars.get(name).cloned().or_else(|| std::env::var(name).ok())
        })
        .into_owned()
    }
}

/// Applies `name` and its parents to `config`.
fn apply_profile(config: &mut Config, name: &str, path: &Path) -> Result<()> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = Some(name.to_string());

    while let Some(profile_name) = current {
        if !seen.insert(profile_name.clone()) {
            return Err(PodforgeError::ConfigParseError {
                file: path.display().to_string(),
                reason: format!("profile '{profile_name}' is its own ancestor"),
            }
            .into());
        }
        let profile = config.profile(&profile_name).cloned().ok_or_else(|| {
            PodforgeError::ProfileNotFound {
                profile: profile_name.clone(),
                file: path.display().to_string(),
            }
        })?;
        current = profile.parent.clone().filter(|p| !p.trim().is_empty());
        chain.push(profile);
    }

    for profile in chain.iter().rev() {
        tracing::trace!("Applying profile '{}' from {}", profile.name, path.display());
        if let Some(replace) = &profile.replace {
            replace.apply(config);
        }
    }
    Ok(())
}
