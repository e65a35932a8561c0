//! Test utilities for podforge
//!
//! Helpers shared by unit tests and the integration suite (through the
//! `test-utils` feature):
//! - [`ProjectTree`] lays out projects with `podforge.yaml` files on disk
//! - [`RecordingClientFactory`] records collaborator construction instead of
//!   reading the user's kubeconfig
//! - [`TestGit`] drives the git CLI for fixture repositories
//!
//! # Example
//!
//! ```rust,no_run
//! use podforge::test_utils::ProjectTree;
//!
//! let temp = tempfile::tempdir().unwrap();
//! let tree = ProjectTree::new(temp.path());
//! tree.project("app", &["db"]);
//! tree.project("db", &[]);
//! assert!(tree.path("app").join("podforge.yaml").exists());
//! ```

pub mod factory;
pub mod git_helper;
pub mod project;

pub use factory::{RecordingClientFactory, TEST_CONTEXT};
pub use git_helper::TestGit;
pub use project::ProjectTree;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, else
/// `RUST_LOG`; without either, tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=podforge=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
