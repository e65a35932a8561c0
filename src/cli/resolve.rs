//! `podforge resolve`: print the dependency tree in deployment order.
//!
//! ```bash
//! podforge resolve
//! podforge resolve --profile staging --output json
//! podforge resolve --update --allow-cyclic
//! ```

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;

use super::ProjectArgs;
use super::common::{DependencySummary, ProjectContext, ResolutionReport};
use crate::dependency::Dependency;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Resolve dependencies and print them in deployment order
#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Fetch the latest state of git dependencies
    #[arg(long)]
    update: bool,

    /// Warn about dependency cycles instead of failing
    #[arg(long)]
    allow_cyclic: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl ResolveCommand {
    pub async fn execute(self, project: &ProjectArgs) -> Result<()> {
        let context = ProjectContext::load(project)?;
        let mut resolver = context.into_resolver(self.allow_cyclic).await?;
        let dependencies = resolver.resolve(self.update).await?;
        print_resolution(resolver.root_id(), &dependencies, self.output)
    }
}

/// Prints resolved dependencies to stdout.
pub(super) fn print_resolution(
    root: &str,
    dependencies: &[Dependency],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let report = ResolutionReport {
                root: root.to_string(),
                dependencies: dependencies.iter().map(DependencySummary::from).collect(),
            };
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize resolution report")?;
            println!("{json}");
        }
        OutputFormat::Text => {
            if dependencies.is_empty() {
                println!("{} has no dependencies", root.bold());
                return Ok(());
            }
            println!(
                "Resolved {} {} of {}",
                dependencies.len(),
                if dependencies.len() == 1 { "dependency" } else { "dependencies" },
                root.bold()
            );
            for (position, dependency) in dependencies.iter().enumerate() {
                let summary = DependencySummary::from(dependency);
                println!("  {}. {}", position + 1, summary.id.green());
                println!("     {} {}", "path:".dimmed(), summary.path);
                if let Some(namespace) = &summary.namespace {
                    println!("     {} {}", "namespace:".dimmed(), namespace);
                }
                if !summary.images_to_build.is_empty() {
                    println!("     {} {}", "build:".dimmed(), summary.images_to_build.join(", "));
                }
                if !summary.deployments.is_empty() {
                    println!("     {} {}", "deploy:".dimmed(), summary.deployments.join(", "));
                }
            }
        }
    }
    Ok(())
}
