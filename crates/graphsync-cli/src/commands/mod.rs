//! CLI command definitions and handlers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use graphsync_core::{GraphSink, GraphSync};
use graphsync_db::SqliteStore;
use graphsync_graph::GraphClient;
use tracing::info;

use crate::config::{Config, DEFAULT_CONFIG_FILE};

pub mod inspect;
pub mod preview;
pub mod query;
pub mod status;
pub mod sync;

/// Load relational tables into a Neo4j property graph
#[derive(Parser)]
#[command(name = "graphsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mapping config file
    #[arg(short, long, global = true, env = "GRAPHSYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load every configured table: all nodes, then all relationships
    Sync(sync::SyncArgs),

    /// Print the statements one table would produce, without running them
    Preview(preview::PreviewArgs),

    /// Run SQL against the relational database
    Query {
        /// SQL text
        sql: String,
        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the keys discovered for a table
    Inspect {
        /// Table name
        table: String,
    },

    /// Show graph node and relationship counts
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(&self.config)?;

        match self.command {
            Commands::Sync(args) => sync::execute(args, &config).await,
            Commands::Preview(args) => preview::execute(args, &config).await,
            Commands::Query { sql, json } => query::execute(&config, &sql, json).await,
            Commands::Inspect { table } => inspect::execute(&config, &table).await,
            Commands::Status => status::execute(&config).await,
        }
    }
}

/// Open the configured relational database.
pub fn open_store(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(&config.database.path)
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))
}

/// Connect to Neo4j within the configured timeout.
pub async fn connect_graph(config: &Config) -> Result<GraphClient> {
    tokio::time::timeout(config.connect_timeout(), GraphClient::connect(&config.neo4j))
        .await
        .with_context(|| format!("Timed out connecting to Neo4j at {}", config.neo4j.uri))?
}

/// Build an engine with every configured table registered.
pub async fn build_engine<G: GraphSink>(config: &Config, graph: G) -> Result<GraphSync<SqliteStore, G>> {
    let mut engine = GraphSync::new(open_store(config)?, graph).with_options(config.sync.clone());
    for mapping in &config.tables {
        engine
            .register_table(mapping.to_spec())
            .await
            .with_context(|| format!("Failed to register table '{}'", mapping.name))?;
    }
    info!(tables = engine.registry().len(), "Registered tables");
    Ok(engine)
}
