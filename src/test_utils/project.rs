//! On-disk project layouts for resolver tests.

use std::path::{Path, PathBuf};

use crate::config::{
    CommandConfig, Config, ConfigLoader, ConfigOptions, DEFAULT_CONFIG_PATH, DependencyConfig,
    DeploymentConfig, ImageConfig, SourceConfig,
};
use crate::dependency::identity::path_identity;

/// A directory of sibling projects, each with its own `podforge.yaml`.
pub struct ProjectTree {
    root: PathBuf,
}

impl ProjectTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of project `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Identity of project `name` when declared as a local dependency.
    pub fn id(&self, name: &str) -> String {
        path_identity(&self.path(name))
    }

    /// Writes project `name` with one image, one deployment, a dev section, a
    /// command and local dependencies on the sibling projects `deps`.
    pub fn project(&self, name: &str, deps: &[&str]) -> PathBuf {
        let dependencies = deps.iter().map(|dep| Self::path_dependency(dep)).collect();
        self.project_with(name, dependencies)
    }

    /// Like [`project`](Self::project) with explicit declarations.
    pub fn project_with(&self, name: &str, dependencies: Vec<DependencyConfig>) -> PathBuf {
        let mut config = Config::default();
        config.images.insert(
            name.to_string(),
            ImageConfig {
                image: format!("registry.acme.io/{name}"),
                ..Default::default()
            },
        );
        config.deployments.push(DeploymentConfig {
            name: name.to_string(),
            ..Default::default()
        });
        config.dev.ports.push(serde_yaml::Value::String(format!("{name}:8080")));
        config.commands.push(CommandConfig {
            name: format!("{name}-test"),
            command: "make test".to_string(),
            description: None,
        });
        config.dependencies = dependencies;

        let yaml = serde_yaml::to_string(&config).expect("serialize fixture config");
        self.write_config(name, &yaml)
    }

    /// A local declaration of sibling project `name`.
    pub fn path_dependency(name: &str) -> DependencyConfig {
        DependencyConfig {
            source: SourceConfig {
                path: Some(format!("../{name}")),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Writes `podforge.yaml` of project `name` verbatim.
    pub fn write_config(&self, name: &str, yaml: &str) -> PathBuf {
        self.write_file(name, DEFAULT_CONFIG_PATH, yaml)
    }

    /// Writes `file` inside project `name`, creating directories as needed.
    pub fn write_file(&self, name: &str, file: &str, content: &str) -> PathBuf {
        let path = self.path(name).join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(&path, content).expect("write fixture file");
        path
    }

    /// Loads project `name`'s configuration without a profile.
    pub fn load_config(&self, name: &str) -> Config {
        ConfigLoader::new(ConfigOptions {
            config_path: Some(self.path(name).join(DEFAULT_CONFIG_PATH)),
            ..Default::default()
        })
        .load()
        .expect("load fixture config")
    }
}
