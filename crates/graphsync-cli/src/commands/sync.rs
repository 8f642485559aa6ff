//! Full two-phase load.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use graphsync_core::{ErrorMode, LoadOptions, MemorySink};

use super::{build_engine, connect_graph};
use crate::config::Config;
use crate::output;

#[derive(Args)]
pub struct SyncArgs {
    /// Generate statements without sending them to Neo4j
    #[arg(long)]
    pub dry_run: bool,

    /// Statements in flight per table
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Record failed rows and keep going
    #[arg(long)]
    pub collect_errors: bool,
}

impl SyncArgs {
    fn options(&self, config: &Config) -> LoadOptions {
        let mut options = config.sync.clone();
        if let Some(concurrency) = self.concurrency {
            options.concurrency = concurrency;
        }
        if self.collect_errors {
            options.error_mode = ErrorMode::Collect;
        }
        options
    }
}

pub async fn execute(args: SyncArgs, config: &Config) -> Result<()> {
    let options = args.options(config);

    if args.dry_run {
        println!("{}", "Dry run: statements are printed, not executed.".dimmed());
        let engine = build_engine(config, MemorySink::new()).await?;
        let report = engine.init_load_with(&options).await?;
        output::print_statements(&engine.graph().take());
        output::print_report(&report);
        return Ok(());
    }

    println!("{}", "Syncing to Neo4j...".bold());
    let client = connect_graph(config).await?;
    let engine = build_engine(config, client).await?;
    let report = engine.init_load_with(&options).await?;

    output::print_report(&report);
    if !report.is_clean() {
        anyhow::bail!("{} row(s) failed", report.errors.len());
    }
    Ok(())
}
