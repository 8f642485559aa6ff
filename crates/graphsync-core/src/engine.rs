//! The top-level engine object.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt};
use tracing::info;

use crate::cypher::{self, RelationshipBatch};
use crate::error::{SyncError, SyncResult};
use crate::load::{self, LoadOptions, LoadReport};
use crate::registry::{TableDefinition, TableRegistry, TableSpec};
use crate::row::Row;
use crate::schema::{SchemaCache, SchemaIntrospector};
use crate::store::{GraphSink, RowSource};

/// Owns the table registry and both store collaborators.
///
/// Tables are registered through `&mut self`; every other operation takes
/// `&self`, so a fully registered engine can be shared freely.
pub struct GraphSync<S, G> {
    source: Arc<S>,
    schema: SchemaCache<Arc<S>>,
    graph: G,
    registry: TableRegistry,
    options: LoadOptions,
}

impl<S, G> GraphSync<S, G>
where
    S: SchemaIntrospector + RowSource,
    G: GraphSink,
{
    pub fn new(source: S, graph: G) -> Self {
        let source = Arc::new(source);
        Self {
            schema: SchemaCache::new(Arc::clone(&source)),
            source,
            graph,
            registry: TableRegistry::new(),
            options: LoadOptions::default(),
        }
    }

    /// Default options for [`init_load`](Self::init_load).
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Register a table, discovering its keys from the catalog.
    pub async fn register_table(&mut self, spec: TableSpec) -> SyncResult<&TableDefinition> {
        self.registry.register(spec, &self.schema).await
    }

    pub fn generate_node(&self, table: &str, row: &Row) -> SyncResult<String> {
        cypher::generate_node(&self.registry, table, row)
    }

    pub fn generate_relationships(&self, table: &str, row: &Row) -> SyncResult<RelationshipBatch> {
        cypher::generate_relationships(&self.registry, table, row)
    }

    /// Full two-phase load with the engine's default options.
    pub async fn init_load(&self) -> SyncResult<LoadReport> {
        self.init_load_with(&self.options).await
    }

    pub async fn init_load_with(&self, options: &LoadOptions) -> SyncResult<LoadReport> {
        load::init_load(&self.registry, self.source.as_ref(), &self.graph, options).await
    }

    /// Raw SQL passthrough, for fixtures and setup.
    pub async fn query(&self, sql: &str) -> SyncResult<Vec<Row>> {
        self.source
            .query(sql)
            .await
            .map_err(|e| SyncError::relational("<query>", e))
    }

    pub async fn find_one(&self, table: &str, key: &Row) -> SyncResult<Option<Row>> {
        self.source
            .find_one(table, key)
            .await
            .map_err(|e| SyncError::relational(table, e))
    }

    /// Every statement a load would send for `table`, without executing any.
    ///
    /// Node statements come first, then relationship statements. Rows that
    /// fail to generate abort the preview.
    pub async fn preview(&self, table: &str, limit: Option<usize>) -> SyncResult<Vec<String>> {
        if !self.registry.contains(table) {
            return Err(SyncError::UnknownTable {
                table: table.to_string(),
                key: Default::default(),
            });
        }

        let stream = self
            .source
            .stream_rows(table)
            .await
            .map_err(|e| SyncError::relational(table, e))?;
        let rows: Vec<Row> = stream
            .take(limit.unwrap_or(usize::MAX))
            .try_collect()
            .await
            .map_err(|e| SyncError::relational(table, e))?;

        let mut statements = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            statements.push(self.generate_node(table, row)?);
        }
        for row in &rows {
            statements.extend(self.generate_relationships(table, row)?.into_result()?);
        }

        info!(table, rows = rows.len(), statements = statements.len(), "Preview generated");
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySink;
    use crate::testing::{authors_spec, books_spec, key, library_schemas};

    async fn engine() -> GraphSync<crate::testing::MemorySource, MemorySink> {
        let mut engine = GraphSync::new(library_schemas(), MemorySink::new());
        engine.register_table(authors_spec()).await.unwrap();
        engine.register_table(books_spec()).await.unwrap();
        engine
    }

    #[tokio::test]
    async fn test_register_table_exposes_definition() {
        let engine = engine().await;

        let books = engine.registry().get("books").unwrap();
        assert_eq!(books.primary_key, vec!["id"]);
        assert_eq!(books.foreign_key("author").unwrap().foreign_table, "authors");
    }

    #[tokio::test]
    async fn test_find_one_then_generate() {
        let engine = engine().await;

        let book = engine.find_one("books", &key("id", 2)).await.unwrap().unwrap();
        let author = engine.find_one("authors", &key("id", 1)).await.unwrap().unwrap();

        assert_eq!(
            engine.generate_node("books", &book).unwrap(),
            "MERGE (:Book {id: 2, title: 'The Great Gatsby'});"
        );
        assert_eq!(
            engine.generate_node("authors", &author).unwrap(),
            "MERGE (:Person:Author {id: 1, name: 'F. Scott Fitzgerald'});"
        );
        assert_eq!(
            engine.generate_relationships("books", &book).unwrap().into_result().unwrap(),
            vec!["MATCH (this:Book), (author:Person:Author) WHERE this.id = 2 AND author.id = 1 MERGE (this)-[:HAS_AUTHOR]->(author);"]
        );
    }

    #[tokio::test]
    async fn test_init_load_uses_graph_sink() {
        let engine = engine().await;

        let report = engine.init_load().await.unwrap();

        assert_eq!(report.nodes + report.relationships, engine.graph().len());
    }

    #[tokio::test]
    async fn test_preview_does_not_execute() {
        let engine = engine().await;

        let statements = engine.preview("books", Some(1)).await.unwrap();

        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("MERGE (:Book"));
        assert!(statements[1].starts_with("MATCH (this:Book)"));
        assert!(engine.graph().is_empty());
    }

    #[tokio::test]
    async fn test_preview_unknown_table() {
        let engine = engine().await;

        let err = engine.preview("missing_table", None).await.unwrap_err();

        assert!(matches!(err, SyncError::UnknownTable { .. }));
    }
}
