//! Centralized error types for graph synchronization.

use thiserror::Error;

use crate::pattern::PatternError;
use crate::row::RowKey;

/// Main error type for registration, statement generation and loading.
///
/// Row-level variants carry the table name and the primary-key values of the
/// offending row so a failed sync can be remediated row by row.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Schema error for table '{table}': {reason}")]
    Schema { table: String, reason: String },

    #[error("Invalid registration for table '{table}': {reason}")]
    InvalidRegistration { table: String, reason: String },

    #[error("Table already registered: {table}")]
    DuplicateTable { table: String },

    #[error("Table not registered: {table} (row: {key})")]
    UnknownTable { table: String, key: RowKey },

    #[error("Invalid relationship pattern on table '{table}' (row: {key}): {source}")]
    PatternSyntax {
        table: String,
        key: RowKey,
        #[source]
        source: PatternError,
    },

    #[error("Invalid alias '{alias}' on table '{table}' (row: {key}): {reason}")]
    InvalidAlias {
        table: String,
        alias: String,
        key: RowKey,
        reason: String,
    },

    #[error("Table '{table}' produced no labels (row: {key})")]
    EmptyLabels { table: String, key: RowKey },

    #[error("Column '{column}' missing from row of table '{table}' (row: {key})")]
    MissingColumn {
        table: String,
        column: String,
        key: RowKey,
    },

    #[error("Relational store error on table '{table}': {source}")]
    Relational {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Graph store error on table '{table}' (row: {key}): {source}")]
    Graph {
        table: String,
        key: RowKey,
        statement: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Result type for graph synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// Create a schema error.
    pub fn schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid registration error.
    pub fn invalid_registration(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a relational collaborator failure.
    pub fn relational(table: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Relational {
            table: table.into(),
            source: source.into(),
        }
    }

    /// Name of the table the error was raised for.
    pub fn table(&self) -> &str {
        match self {
            Self::Schema { table, .. }
            | Self::InvalidRegistration { table, .. }
            | Self::DuplicateTable { table }
            | Self::UnknownTable { table, .. }
            | Self::PatternSyntax { table, .. }
            | Self::InvalidAlias { table, .. }
            | Self::EmptyLabels { table, .. }
            | Self::MissingColumn { table, .. }
            | Self::Relational { table, .. }
            | Self::Graph { table, .. } => table,
        }
    }

    /// Primary-key values of the offending row, when the error is row-level.
    pub fn row_key(&self) -> Option<&RowKey> {
        match self {
            Self::UnknownTable { key, .. }
            | Self::PatternSyntax { key, .. }
            | Self::InvalidAlias { key, .. }
            | Self::EmptyLabels { key, .. }
            | Self::MissingColumn { key, .. }
            | Self::Graph { key, .. } => Some(key),
            _ => None,
        }
    }
}
