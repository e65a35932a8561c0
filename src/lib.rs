//! podforge - dependency resolution for containerized development projects
//!
//! A project describes itself in a `podforge.yaml`: the images it builds, the
//! deployments it rolls out and the other projects it depends on. Those
//! dependencies can live in local directories or git repositories and can
//! declare dependencies of their own. podforge acquires every dependency once,
//! loads it with the requested profile, binds it to a cluster namespace and
//! hands the pipeline an ordered list in which every dependency comes after
//! its own dependencies.
//!
//! # Architecture Overview
//!
//! ```text
//!   podforge.yaml ──► Resolver ──► Graph (identity-keyed, cycle-checked edges)
//!                        │              │
//!                        │              └─► drain leaves ─► Vec<Dependency>
//!                        ▼
//!                   Materializer
//!                   ├─ SourceFetcher   (local path / git checkout)
//!                   ├─ ConfigLoader    (profiles, variables)
//!                   ├─ GeneratedLoader (build/deploy cache)
//!                   └─ ClientFactory   (kube, docker, registry, build, deploy)
//! ```
//!
//! # Core Modules
//!
//! - [`dependency`] - graph store, identities, source acquisition and the resolver
//! - [`config`] - `podforge.yaml` schema and loading
//! - [`generated`] - the per-project generated cache
//! - [`core`] - error types and user-facing error rendering
//! - [`cli`] - command-line interface
//!
//! ## Collaborators
//!
//! - [`kube`] - cluster bindings from the kubeconfig
//! - [`docker`] - container engine client
//! - [`build`] - image build controller
//! - [`deploy`] - deployment controller
//! - [`pullsecrets`] - registry client
//!
//! ## Supporting Modules
//!
//! - [`git`] - git CLI wrapper
//! - [`utils`] - paths, atomic writes, hashing
//!
//! # Configuration Example
//!
//! ```yaml
//! version: v1
//! images:
//!   api:
//!     image: registry.acme.io/api
//! deployments:
//!   - name: api
//!     helm:
//!       chart: ./chart
//! dependencies:
//!   - name: db
//!     source:
//!       git: https://github.com/acme/db.git
//!       branch: main
//!     namespace: data
//!   - source:
//!       path: ../auth
//!     profile: local
//!     skipBuild: true
//! ```

pub mod build;
pub mod cli;
pub mod config;
pub mod core;
pub mod dependency;
pub mod deploy;
pub mod docker;
pub mod generated;
pub mod git;
pub mod kube;
pub mod pullsecrets;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
