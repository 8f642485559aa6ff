//! Mapping configuration file.
//!
//! ```toml
//! [database]
//! path = "library.db"
//!
//! [neo4j]
//! uri = "bolt://localhost:7687"
//!
//! [sync]
//! concurrency = 8
//! error_mode = "collect"
//!
//! [[tables]]
//! name = "books"
//! labels = ["Book"]
//! properties = ["id", "title"]
//! relationships = ["(this)-[:HAS_AUTHOR]->(author)"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use graphsync_core::{LoadOptions, RelationshipPattern, TableSpec, Value};
use graphsync_graph::GraphConfig;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "graphsync.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub neo4j: GraphConfig,
    /// Seconds to wait for the Neo4j handshake.
    pub connect_timeout_secs: u64,
    pub sync: LoadOptions,
    pub tables: Vec<TableMapping>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("graphsync.db"),
        }
    }
}

/// Mapping rules for one table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableMapping {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    /// Column whose value is added as an extra label. Relationship endpoints
    /// only see key columns, so they are matched on `labels` alone.
    #[serde(default)]
    pub label_column: Option<String>,
    /// Property columns; every column when absent.
    #[serde(default)]
    pub properties: Option<Vec<String>>,
    #[serde(default)]
    pub relationships: Vec<RelationshipPattern>,
}

impl TableMapping {
    pub fn to_spec(&self) -> TableSpec {
        let labels = self.labels.clone();
        let label_column = self.label_column.clone();
        let mut spec = TableSpec::new(&self.name).labels(move |row| {
            let mut labels = labels.clone();
            if let Some(column) = &label_column {
                match row.get(column) {
                    Some(Value::Null) | None => {}
                    Some(Value::Text(s)) => labels.push(s.clone()),
                    Some(other) => labels.push(other.to_string()),
                }
            }
            labels
        });

        spec = match &self.properties {
            Some(columns) => {
                let columns = columns.clone();
                spec.properties(move |row| row.select(&columns))
            }
            None => spec.all_properties(),
        };

        if !self.relationships.is_empty() {
            let patterns = self.relationships.clone();
            spec = spec.relationships(move |_| patterns.clone());
        }
        spec
    }
}

impl Config {
    /// Read a config file and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::parse(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for table in &self.tables {
            // Relationships into this table compute its labels from key
            // columns only; a label_column alone would leave them empty.
            if table.labels.is_empty() {
                bail!(
                    "Table '{}' needs at least one entry in labels; label_column only adds to them",
                    table.name
                );
            }
        }
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("GRAPHSYNC_DB") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(uri) = lookup("NEO4J_URI") {
            self.neo4j.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.neo4j.user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.neo4j.password = password;
        }
        if let Some(db) = lookup("NEO4J_DB") {
            self.neo4j.db = db;
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        match self.connect_timeout_secs {
            0 => Duration::from_secs(10),
            secs => Duration::from_secs(secs),
        }
    }
}
