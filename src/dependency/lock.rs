//! Process-level locking of dependency checkouts.
//!
//! Two podforge processes resolving the same git dependency would otherwise
//! clone into the same directory at once. Each checkout gets a lock file under
//! `<dependencies dir>/.locks/`, held for the duration of the acquisition.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::core::{FileOperation, FileResultExt};

/// Exclusive lock on one checkout directory. Released on drop.
#[derive(Debug)]
pub struct CheckoutLock {
    file: File,
    path: PathBuf,
}

impl CheckoutLock {
    /// Blocks (off the async runtime) until the lock for `key` is acquired.
    ///
    /// The lock file is `<dependencies_dir>/.locks/<key>.lock`.
    pub async fn acquire(dependencies_dir: &Path, key: &str) -> Result<Self> {
        let locks_dir = dependencies_dir.join(".locks");
        tokio::fs::create_dir_all(&locks_dir).await.with_file_context(
            FileOperation::CreateDir,
            &locks_dir,
            "creating the checkout locks directory",
            "dependency::lock",
        )?;

        let lock_path = locks_dir.join(format!("{key}.lock"));
        let open_path = lock_path.clone();

        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&open_path)
                .with_file_context(
                    FileOperation::Lock,
                    &open_path,
                    "opening the checkout lock file",
                    "dependency::lock",
                )?;

            file.lock_exclusive().with_file_context(
                FileOperation::Lock,
                &open_path,
                "waiting for the checkout lock",
                "dependency::lock",
            )?;
            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        tracing::trace!("Acquired checkout lock {}", lock_path.display());
        Ok(Self {
            file,
            path: lock_path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CheckoutLock {
    fn drop(&mut self) {
        #[allow(unstable_name_collisions)]
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
