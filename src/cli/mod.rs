//! Command-line interface for podforge.
//!
//! # Commands
//!
//! - `resolve` - resolve the project's dependency tree and print it in
//!   deployment order
//! - `update` - like `resolve`, refreshing git dependencies from their remotes
//!
//! # Global options
//!
//! - `-v, --verbose` - debug logging
//! - `-q, --quiet` - no logging
//! - `-c, --config <PATH>` - configuration file (default `./podforge.yaml`)
//! - `-p, --profile <NAME>` - profile to load the project with
//! - `-n, --namespace <NS>` / `--kube-context <CTX>` - cluster binding
//! - `--var KEY=VALUE` - variable substituted into configuration files
//!
//! Log output honours `RUST_LOG` when it is set.

mod common;
mod resolve;
mod update;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use common::ProjectContext;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter, `None` to disable logging
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Installs the tracing subscriber. `RUST_LOG` takes precedence over the
    /// configured level.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if let Some(level) = &self.log_level {
            EnvFilter::new(format!("podforge={level},git={level}"))
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "podforge",
    about = "Resolve and order the dependencies of containerized dev projects",
    version,
    long_about = "podforge reads a project's podforge.yaml, acquires the projects it depends on \
                  (local directories or git repositories) and orders them so every dependency \
                  comes after its own dependencies."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    project: ProjectArgs,
}

/// Options locating and loading the invoking project.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ProjectArgs {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "PODFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Profile to apply to the project's configuration
    #[arg(short, long, global = true, env = "PODFORGE_PROFILE")]
    pub profile: Option<String>,

    /// Namespace to deploy into
    #[arg(short, long, global = true)]
    pub namespace: Option<String>,

    /// Kube context to use instead of the current one
    #[arg(long, global = true)]
    pub kube_context: Option<String>,

    /// Variable for configuration files, as KEY=VALUE
    #[arg(long = "var", global = true, value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve dependencies and print them in deployment order
    Resolve(resolve::ResolveCommand),

    /// Refresh git dependencies and resolve
    Update(update::UpdateCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        self.build_config().init_logging();
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(&self.project).await,
            Commands::Update(cmd) => cmd.execute(&self.project).await,
        }
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            None
        } else {
            Some("info".to_string())
        };
        CliConfig {
            log_level,
        }
    }
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("invalid variable '{raw}', expected KEY=VALUE"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid variable '{raw}', the name is empty"));
    }
    Ok((key.to_string(), value.to_string()))
}
