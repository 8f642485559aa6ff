//! Dry run for a single table.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use graphsync_core::MemorySink;

use super::build_engine;
use crate::config::Config;
use crate::output;

#[derive(Args)]
pub struct PreviewArgs {
    /// Registered table name
    pub table: String,

    /// Only read the first N rows
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub async fn execute(args: PreviewArgs, config: &Config) -> Result<()> {
    let engine = build_engine(config, MemorySink::new()).await?;
    let statements = engine.preview(&args.table, args.limit).await?;

    println!("{} {}", "Preview of".bold(), args.table.cyan());
    println!("{}", "─".repeat(50));
    output::print_statements(&statements);
    Ok(())
}
