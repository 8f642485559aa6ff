//! Graph status.

use anyhow::Result;
use colored::Colorize;

use super::connect_graph;
use crate::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    println!("{}", "Graph Status".bold());
    println!("{}", "─".repeat(40));

    let client = connect_graph(config).await?;
    let counts = client.get_counts().await?;
    println!("  Neo4j:         {}", config.neo4j.uri.dimmed());
    println!("  Nodes:         {}", counts.nodes.to_string().cyan());
    println!("  Relationships: {}", counts.relationships.to_string().cyan());
    println!("  Mapped tables: {}", config.tables.len().to_string().cyan());

    println!("{}", "─".repeat(40));
    Ok(())
}
