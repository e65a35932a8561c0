//! `podforge update`: refresh git dependencies and resolve.
//!
//! Equivalent to `podforge resolve --update`. Existing checkouts are fetched
//! and moved to the latest commit of their branch (or re-checked-out at their
//! tag or revision); local dependencies are used as they are.

use anyhow::Result;
use clap::Args;

use super::ProjectArgs;
use super::common::ProjectContext;
use super::resolve::{OutputFormat, print_resolution};

/// Refresh git dependencies and resolve
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Warn about dependency cycles instead of failing
    #[arg(long)]
    allow_cyclic: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

impl UpdateCommand {
    pub async fn execute(self, project: &ProjectArgs) -> Result<()> {
        let context = ProjectContext::load(project)?;
        let mut resolver = context.into_resolver(self.allow_cyclic).await?;
        let dependencies = resolver.resolve(true).await?;
        tracing::info!("Updated {} dependencies", dependencies.len());
        print_resolution(resolver.root_id(), &dependencies, self.output)
    }
}
