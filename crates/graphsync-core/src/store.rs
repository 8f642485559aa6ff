//! Collaborator seams: where rows come from and where statements go.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::row::Row;

/// Rows of one table, produced as they are read.
pub type RowStream = BoxStream<'static, Result<Row>>;

/// Relational side: full-table scans plus a raw query passthrough.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Stream every row of `table`.
    async fn stream_rows(&self, table: &str) -> Result<RowStream>;

    /// Run arbitrary SQL and return whatever rows it yields.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// First row of `table` whose columns equal every `(column, value)` in `key`.
    async fn find_one(&self, table: &str, key: &Row) -> Result<Option<Row>>;
}

#[async_trait]
impl<T: RowSource + ?Sized> RowSource for Arc<T> {
    async fn stream_rows(&self, table: &str) -> Result<RowStream> {
        (**self).stream_rows(table).await
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        (**self).query(sql).await
    }

    async fn find_one(&self, table: &str, key: &Row) -> Result<Option<Row>> {
        (**self).find_one(table, key).await
    }
}

/// Graph side: executes one textual statement.
#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn run(&self, statement: &str) -> Result<()>;
}

#[async_trait]
impl<T: GraphSink + ?Sized> GraphSink for Arc<T> {
    async fn run(&self, statement: &str) -> Result<()> {
        (**self).run(statement).await
    }
}

/// Records statements instead of executing them. Used for dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    statements: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements received so far, in arrival order.
    pub fn statements(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GraphSink for MemorySink {
    async fn run(&self, statement: &str) -> Result<()> {
        self.lock().push(statement.to_string());
        Ok(())
    }
}
