//! Table registration and the per-table mapping rules.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::error::{SyncError, SyncResult};
use crate::pattern::{is_alias, RelationshipPattern, THIS};
use crate::row::{Row, RowKey};
use crate::schema::{ColumnType, ForeignKeyDef, SchemaIntrospector, TableSchema};

/// Row → node labels.
pub type LabelsFn = Arc<dyn Fn(&Row) -> Vec<String> + Send + Sync>;
/// Row → node properties, in output order.
pub type PropertiesFn = Arc<dyn Fn(&Row) -> Row + Send + Sync>;
/// Row → relationship patterns.
pub type RelationshipsFn = Arc<dyn Fn(&Row) -> Vec<RelationshipPattern> + Send + Sync>;

/// Caller-supplied registration input for one table.
#[derive(Clone)]
pub struct TableSpec {
    pub table_name: String,
    labels: Option<LabelsFn>,
    properties: Option<PropertiesFn>,
    relationships: Option<RelationshipsFn>,
}

impl TableSpec {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            labels: None,
            properties: None,
            relationships: None,
        }
    }

    /// Labels for a row. When the table is the target of a relationship the
    /// closure receives only the primary-key columns, so it must still
    /// return at least one label for such a row.
    pub fn labels<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> Vec<String> + Send + Sync + 'static,
    {
        self.labels = Some(Arc::new(f));
        self
    }

    /// Same labels for every row.
    pub fn static_labels<I, S>(self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        self.labels(move |_| labels.clone())
    }

    pub fn properties<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> Row + Send + Sync + 'static,
    {
        self.properties = Some(Arc::new(f));
        self
    }

    /// Every column of the row becomes a property.
    pub fn all_properties(self) -> Self {
        self.properties(|row| row.clone())
    }

    pub fn relationships<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> Vec<RelationshipPattern> + Send + Sync + 'static,
    {
        self.relationships = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for TableSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSpec")
            .field("table_name", &self.table_name)
            .field("labels", &self.labels.is_some())
            .field("properties", &self.properties.is_some())
            .field("relationships", &self.relationships.is_some())
            .finish()
    }
}

/// A registered table: discovered keys plus the mapping rules.
pub struct TableDefinition {
    pub table_name: String,
    pub primary_key: Vec<String>,
    /// Keyed by alias, in catalog order.
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub column_types: Vec<(String, ColumnType)>,
    labels: LabelsFn,
    properties: PropertiesFn,
    relationships: Option<RelationshipsFn>,
}

impl TableDefinition {
    pub fn labels(&self, row: &Row) -> Vec<String> {
        (self.labels)(row)
    }

    pub fn properties(&self, row: &Row) -> Row {
        (self.properties)(row)
    }

    /// Patterns for `row`; empty when the table declares no relationships.
    pub fn relationships(&self, row: &Row) -> Vec<RelationshipPattern> {
        self.relationships
            .as_ref()
            .map(|f| f(row))
            .unwrap_or_default()
    }

    pub fn has_relationships(&self) -> bool {
        self.relationships.is_some()
    }

    pub fn foreign_key(&self, alias: &str) -> Option<&ForeignKeyDef> {
        self.foreign_keys.iter().find(|fk| fk.alias == alias)
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.column_types
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
    }

    /// Primary-key values of `row`.
    pub fn row_key(&self, row: &Row) -> RowKey {
        row.key(&self.primary_key)
    }

    fn build(spec: TableSpec, schema: TableSchema) -> SyncResult<Self> {
        let table = spec.table_name;
        let (Some(labels), Some(properties)) = (spec.labels, spec.properties) else {
            return Err(SyncError::invalid_registration(&table, "labels and properties are required"));
        };
        if schema.primary_key.is_empty() {
            return Err(SyncError::schema(&table, "no primary key declared"));
        }

        let mut foreign_keys: Vec<ForeignKeyDef> = Vec::with_capacity(schema.foreign_keys.len());
        for fk in &schema.foreign_keys {
            let def = ForeignKeyDef::from_ref(fk);
            if def.alias == THIS {
                return Err(SyncError::schema(
                    &table,
                    format!("foreign key column '{}' derives the reserved alias '{}'", fk.column, THIS),
                ));
            }
            if let Some(existing) = foreign_keys.iter().find(|f| f.alias == def.alias) {
                return Err(SyncError::schema(
                    &table,
                    format!(
                        "foreign key columns '{}' and '{}' both derive alias '{}'",
                        existing.local_column, def.local_column, def.alias
                    ),
                ));
            }
            foreign_keys.push(def);
        }

        Ok(Self {
            table_name: table,
            primary_key: schema.primary_key,
            foreign_keys,
            column_types: schema.column_types,
            labels,
            properties,
            relationships: spec.relationships,
        })
    }
}

impl fmt::Debug for TableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDefinition")
            .field("table_name", &self.table_name)
            .field("primary_key", &self.primary_key)
            .field("foreign_keys", &self.foreign_keys)
            .field("column_types", &self.column_types)
            .finish_non_exhaustive()
    }
}

/// Registered tables, in registration order.
///
/// Mutated only through `&mut` while tables are registered; shared by
/// reference afterwards.
#[derive(Debug, Default)]
pub struct TableRegistry {
    tables: Vec<TableDefinition>,
    index: HashMap<String, usize>,
}

impl TableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate, introspect and store a table. Nothing is stored on failure.
    pub async fn register<I>(&mut self, spec: TableSpec, introspector: &I) -> SyncResult<&TableDefinition>
    where
        I: SchemaIntrospector + ?Sized,
    {
        self.validate(&spec)?;
        let schema = introspector.introspect(&spec.table_name).await?;
        self.insert(spec, schema)
    }

    /// Checks that need no catalog access.
    pub fn validate(&self, spec: &TableSpec) -> SyncResult<()> {
        let table = &spec.table_name;
        if !is_alias(table) {
            return Err(SyncError::invalid_registration(
                table,
                "table name must match [A-Za-z_][A-Za-z0-9_]*",
            ));
        }
        if spec.labels.is_none() {
            return Err(SyncError::invalid_registration(table, "missing labels mapping"));
        }
        if spec.properties.is_none() {
            return Err(SyncError::invalid_registration(table, "missing properties mapping"));
        }
        if self.contains(table) {
            return Err(SyncError::DuplicateTable {
                table: table.clone(),
            });
        }
        Ok(())
    }

    /// Store a table from an already introspected schema.
    pub fn insert(&mut self, spec: TableSpec, schema: TableSchema) -> SyncResult<&TableDefinition> {
        self.validate(&spec)?;
        let definition = TableDefinition::build(spec, schema)?;

        info!(
            table = %definition.table_name,
            primary_key = ?definition.primary_key,
            foreign_keys = definition.foreign_keys.len(),
            "Registered table"
        );

        let position = self.tables.len();
        self.index.insert(definition.table_name.clone(), position);
        self.tables.push(definition);
        Ok(&self.tables[position])
    }

    pub fn get(&self, table: &str) -> Option<&TableDefinition> {
        self.index.get(table).map(|&i| &self.tables[i])
    }

    pub fn contains(&self, table: &str) -> bool {
        self.index.contains_key(table)
    }

    /// Tables in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &TableDefinition> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
