//! Project configuration and podforge's on-disk locations.
//!
//! A project is described by a `podforge.yaml` at its root. The file lists the
//! images to build, the deployments to roll out, development-session settings,
//! project commands and the other projects it depends on. Named profiles can
//! replace whole sections of the file.
//!
//! # Directory layout
//!
//! ```text
//! ~/.podforge/                    # PODFORGE_HOME
//! └── dependencies/               # PODFORGE_DEPENDENCIES_DIR
//!     ├── .locks/                 # per-checkout lock files
//!     └── <sha256 of source>/     # one git checkout per repository and ref
//!
//! <project>/
//! ├── podforge.yaml
//! └── .podforge/
//!     └── generated.yaml          # build/deploy cache, one scope per profile
//! ```

mod latest;
mod loader;

pub use latest::{
    CommandConfig, Config, DependencyConfig, DeploymentConfig, DevConfig, HelmConfig,
    ImageConfig, KubectlConfig, ProfileConfig, ProfileReplace, SourceConfig,
};
pub use loader::{ConfigLoader, ConfigOptions};

use anyhow::Result;
use std::path::PathBuf;

use crate::utils::platform::get_home_dir;

/// Default configuration file name, relative to a project root.
pub const DEFAULT_CONFIG_PATH: &str = "podforge.yaml";

/// Location of the generated cache, relative to a project root.
pub const GENERATED_CONFIG_PATH: &str = ".podforge/generated.yaml";

/// Returns podforge's home directory.
///
/// `PODFORGE_HOME` overrides the default of `~/.podforge`.
pub fn get_podforge_home() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PODFORGE_HOME") {
        return Ok(PathBuf::from(dir));
    }
    Ok(get_home_dir()?.join(".podforge"))
}

/// Returns the directory git dependencies are checked out into.
///
/// `PODFORGE_DEPENDENCIES_DIR` overrides the default of
/// `<podforge home>/dependencies`.
pub fn get_dependencies_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PODFORGE_DEPENDENCIES_DIR") {
        return Ok(PathBuf::from(dir));
    }
    Ok(get_podforge_home()?.join("dependencies"))
}
