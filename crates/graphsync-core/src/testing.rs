//! In-memory relational fixtures for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;

use crate::error::{SyncError, SyncResult};
use crate::registry::{TableRegistry, TableSpec};
use crate::row::{Row, Value};
use crate::schema::{ColumnType, ForeignKeyRef, SchemaIntrospector, TableSchema};
use crate::store::{RowSource, RowStream};

/// Tables held in memory: schema plus rows.
#[derive(Default)]
pub struct MemorySource {
    tables: HashMap<String, (TableSchema, Vec<Row>)>,
    /// Tables streamed so far, in order.
    pub scans: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn table(mut self, schema: TableSchema, rows: Vec<Row>) -> Self {
        self.tables.insert(schema.table.clone(), (schema, rows));
        self
    }

    pub fn scans(&self) -> Vec<String> {
        self.scans.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaIntrospector for MemorySource {
    async fn introspect(&self, table: &str) -> SyncResult<TableSchema> {
        self.tables
            .get(table)
            .map(|(schema, _)| schema.clone())
            .ok_or_else(|| SyncError::schema(table, "table does not exist"))
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn stream_rows(&self, table: &str) -> Result<RowStream> {
        let (_, rows) = self
            .tables
            .get(table)
            .ok_or_else(|| anyhow!("no such table: {}", table))?;
        self.scans.lock().unwrap().push(table.to_string());
        Ok(futures::stream::iter(rows.clone().into_iter().map(Ok)).boxed())
    }

    async fn query(&self, _sql: &str) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn find_one(&self, table: &str, key: &Row) -> Result<Option<Row>> {
        let (_, rows) = self
            .tables
            .get(table)
            .ok_or_else(|| anyhow!("no such table: {}", table))?;
        Ok(rows
            .iter()
            .find(|row| key.iter().all(|(column, value)| row.get(column) == Some(value)))
            .cloned())
    }
}

fn schema(
    table: &str,
    primary_key: &[&str],
    columns: &[(&str, ColumnType)],
    foreign_keys: &[(i64, &str, &str, &str)],
) -> TableSchema {
    TableSchema {
        table: table.to_string(),
        primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
        foreign_keys: foreign_keys
            .iter()
            .map(|(constraint, column, foreign_table, foreign_column)| ForeignKeyRef {
                constraint: *constraint,
                column: column.to_string(),
                foreign_table: foreign_table.to_string(),
                foreign_column: foreign_column.to_string(),
            })
            .collect(),
        column_types: columns.iter().map(|(c, ty)| (c.to_string(), *ty)).collect(),
    }
}

/// A small library database: authors, books and a few tables exercising
/// composite and differently typed keys.
pub fn library_schemas() -> MemorySource {
    use ColumnType::*;

    let books_schema = |name: &str| {
        schema(
            name,
            &["id"],
            &[("id", Integer), ("title", Text), ("author_id", Integer)],
            &[(0, "author_id", "authors", "id")],
        )
    };

    MemorySource::default()
        .table(
            schema("authors", &["id"], &[("id", Integer), ("name", Text)], &[]),
            vec![
                Row::new().with("id", 1).with("name", "F. Scott Fitzgerald"),
                Row::new().with("id", 2).with("name", "Ernest Hemingway"),
            ],
        )
        .table(
            books_schema("books"),
            vec![
                Row::new().with("id", 1).with("title", "The Sun Also Rises").with("author_id", 2),
                Row::new().with("id", 2).with("title", "The Great Gatsby").with("author_id", 1),
            ],
        )
        .table(books_schema("novels"), Vec::new())
        .table(
            schema("publishers", &["code"], &[("code", Text), ("name", Text)], &[]),
            vec![Row::new().with("code", "SCR").with("name", "Scribner")],
        )
        .table(
            schema(
                "loans",
                &["id"],
                &[("id", Text), ("book_id", Text)],
                &[(0, "book_id", "books", "id")],
            ),
            vec![Row::new().with("id", "L1").with("book_id", "2")],
        )
        .table(
            schema(
                "editions",
                &["book_id", "number"],
                &[("book_id", Integer), ("number", Integer)],
                &[(0, "book_id", "books", "id")],
            ),
            Vec::new(),
        )
        .table(
            schema(
                "reprints",
                &["id"],
                &[("id", Integer), ("edition_book", Integer), ("edition_number", Integer)],
                &[
                    (0, "edition_book", "editions", "book_id"),
                    (0, "edition_number", "editions", "number"),
                ],
            ),
            Vec::new(),
        )
        .table(
            schema(
                "swaps",
                &["id"],
                &[
                    ("id", Integer),
                    ("from_book", Integer),
                    ("from_number", Integer),
                    ("to_book", Integer),
                    ("to_number", Integer),
                ],
                &[
                    (0, "from_book", "editions", "book_id"),
                    (0, "from_number", "editions", "number"),
                    (1, "to_book", "editions", "book_id"),
                    (1, "to_number", "editions", "number"),
                ],
            ),
            Vec::new(),
        )
}

/// Registry with `authors` (Person:Author) and `books` (Book, HAS_AUTHOR).
pub async fn library_registry() -> TableRegistry {
    let source = library_schemas();
    let mut registry = TableRegistry::new();
    registry.register(authors_spec(), &source).await.unwrap();
    registry.register(books_spec(), &source).await.unwrap();
    registry
}

pub fn authors_spec() -> TableSpec {
    TableSpec::new("authors")
        .static_labels(["Person", "Author"])
        .all_properties()
}

pub fn books_spec() -> TableSpec {
    TableSpec::new("books")
        .static_labels(["Book"])
        .properties(|row| row.select(&["id", "title"]))
        .relationships(|_| vec!["(this)-[:HAS_AUTHOR]->(author)".into()])
}

/// Key row helper for `find_one`.
pub fn key(column: &str, value: impl Into<Value>) -> Row {
    Row::new().with(column, value)
}
