//! Shared helpers for the integration suite.

#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use podforge::test_utils::{ProjectTree, TestGit};

/// A temporary workspace: sibling projects, fixture git repositories and an
/// isolated podforge home.
pub struct TestProject {
    _temp_dir: TempDir,
    tree: ProjectTree,
    home_dir: PathBuf,
    deps_dir: PathBuf,
    sources_dir: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let workspace = temp_dir.path().join("workspace");
        let home_dir = temp_dir.path().join("home");
        let deps_dir = home_dir.join("dependencies");
        let sources_dir = temp_dir.path().join("sources");
        std::fs::create_dir_all(&workspace)?;
        std::fs::create_dir_all(&sources_dir)?;

        Ok(Self {
            tree: ProjectTree::new(workspace),
            _temp_dir: temp_dir,
            home_dir,
            deps_dir,
            sources_dir,
        })
    }

    pub fn tree(&self) -> &ProjectTree {
        &self.tree
    }

    pub fn deps_path(&self) -> &Path {
        &self.deps_dir
    }

    /// Creates a git repository holding a project with the given
    /// `podforge.yaml`, committed on `main`.
    pub fn create_source_repo(&self, name: &str, config: &str) -> Result<TestSourceRepo> {
        let path = self.sources_dir.join(name);
        let git = TestGit::new(&path);
        git.init()?;
        std::fs::write(path.join("podforge.yaml"), config)?;
        git.commit_all("Initial commit")?;
        Ok(TestSourceRepo {
            path,
            git,
        })
    }

    /// `podforge` run inside project `name`, isolated from the user's home,
    /// kubeconfig and environment overrides.
    pub fn podforge(&self, name: &str) -> Command {
        let mut cmd = Command::cargo_bin("podforge").expect("podforge binary");
        cmd.current_dir(self.tree.path(name))
            .env("PODFORGE_HOME", &self.home_dir)
            .env("PODFORGE_DEPENDENCIES_DIR", &self.deps_dir)
            .env("KUBECONFIG", self.home_dir.join("missing-kubeconfig"))
            .env("NO_COLOR", "1")
            .env_remove("PODFORGE_PROFILE")
            .env_remove("PODFORGE_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// A fixture git repository.
pub struct TestSourceRepo {
    pub path: PathBuf,
    pub git: TestGit,
}

impl TestSourceRepo {
    pub fn write(&self, file: &str, content: &str) -> Result<()> {
        let target = self.path.join(file);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target, content)?;
        Ok(())
    }

    pub fn file_url(&self) -> String {
        self.git.file_url()
    }
}
