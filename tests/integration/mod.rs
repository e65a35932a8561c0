//! Integration test suite for podforge
//!
//! End-to-end tests of dependency resolution against real project trees on
//! disk, real git repositories (through `file://` URLs) and the `podforge`
//! binary.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: ordering, deduplication, cycles, declaration options
//! - **generated_cache**: persistence of the invoking project's cache
//! - **git_sources**: cloning, reuse and updates of git dependencies
//! - **cli**: the `resolve` and `update` commands

#[path = "../common/mod.rs"]
mod common;

mod generated_cache;
mod git_sources;
mod resolution;
