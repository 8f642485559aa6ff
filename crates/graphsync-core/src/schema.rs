//! Relational schema metadata: key discovery and column typing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::SyncResult;

/// Declared type class of a relational column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
    Blob,
    Numeric,
}

impl ColumnType {
    /// Classify a declared column type.
    ///
    /// Follows SQLite's affinity rules, with `BOOL` and `DATE`/`TIME`
    /// recognized ahead of them.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("BOOL") {
            Self::Boolean
        } else if upper.contains("DATE") || upper.contains("TIME") {
            Self::Timestamp
        } else if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.is_empty() || upper.contains("BLOB") {
            Self::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Numeric
        }
    }
}

/// A foreign-key column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Constraint the column belongs to. The columns of one composite key
    /// share it.
    pub constraint: i64,
    pub column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

/// Catalog metadata for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table: String,
    /// Primary-key columns in key order. Never empty.
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyRef>,
    /// Columns in declaration order with their type class.
    pub column_types: Vec<(String, ColumnType)>,
}

impl TableSchema {
    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.column_types
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }
}

/// A foreign key resolved to the alias patterns refer to it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub alias: String,
    pub constraint: i64,
    pub local_column: String,
    pub foreign_table: String,
    pub foreign_column: String,
}

impl ForeignKeyDef {
    pub fn from_ref(fk: &ForeignKeyRef) -> Self {
        Self {
            alias: derive_alias(&fk.column),
            constraint: fk.constraint,
            local_column: fk.column.clone(),
            foreign_table: fk.foreign_table.clone(),
            foreign_column: fk.foreign_column.clone(),
        }
    }
}

/// Derive a pattern alias from a foreign-key column name.
///
/// `author_id` and `authorId` both become `author`; a column without an id
/// suffix keeps its name.
pub fn derive_alias(column: &str) -> String {
    let lower = column.to_ascii_lowercase();
    if lower.len() > 3 && lower.ends_with("_id") {
        return column[..column.len() - 3].to_string();
    }
    if column.len() > 2 && column.ends_with("Id") {
        let stem = &column[..column.len() - 2];
        if stem.chars().last().is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return stem.to_string();
        }
    }
    column.to_string()
}

/// Source of catalog metadata.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Discover primary key, foreign keys and column types of `table`.
    ///
    /// Fails with [`SyncError::Schema`](crate::SyncError::Schema) when the
    /// table does not exist or declares no primary key.
    async fn introspect(&self, table: &str) -> SyncResult<TableSchema>;
}

#[async_trait]
impl<T: SchemaIntrospector + ?Sized> SchemaIntrospector for Arc<T> {
    async fn introspect(&self, table: &str) -> SyncResult<TableSchema> {
        (**self).introspect(table).await
    }
}

/// Caches successful introspection results for the life of the process.
pub struct SchemaCache<I> {
    inner: I,
    cache: Mutex<HashMap<String, TableSchema>>,
}

impl<I> SchemaCache<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn cached(&self, table: &str) -> Option<TableSchema> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(table)
            .cloned()
    }
}

#[async_trait]
impl<I: SchemaIntrospector> SchemaIntrospector for SchemaCache<I> {
    async fn introspect(&self, table: &str) -> SyncResult<TableSchema> {
        if let Some(schema) = self.cached(table) {
            debug!(table, "Schema cache hit");
            return Ok(schema);
        }

        let schema = self.inner.introspect(table).await?;
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(table.to_string(), schema.clone());
        Ok(schema)
    }
}
