//! SQLite implementation of the relational collaborator.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use graphsync_core::pattern::is_alias;
use graphsync_core::{Row, RowSource, RowStream, SchemaIntrospector, SyncError, SyncResult, TableSchema};
use rusqlite::params_from_iter;
use tokio::sync::mpsc;
use tracing::debug;

use crate::catalog;
use crate::pool::{DbError, DbPool, DbResult};
use crate::rows;

/// Rows buffered between the scanning thread and the consumer.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Relational source backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
    channel_capacity: usize,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> DbResult<Self> {
        Ok(Self::new(DbPool::open(path)?))
    }

    pub fn in_memory() -> DbResult<Self> {
        Ok(Self::new(DbPool::in_memory()?))
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Double-quote a table or column name after checking it is a plain identifier.
fn quote_identifier(name: &str) -> DbResult<String> {
    if is_alias(name) {
        Ok(format!("\"{}\"", name))
    } else {
        Err(DbError::InvalidIdentifier(name.to_string()))
    }
}

#[async_trait]
impl SchemaIntrospector for SqliteStore {
    async fn introspect(&self, table: &str) -> SyncResult<TableSchema> {
        let name = table.to_string();
        let schema = self
            .pool
            .run(move |conn| catalog::table_schema(conn, &name))
            .await
            .map_err(|e| SyncError::relational(table, e))?;

        match schema {
            None => Err(SyncError::schema(table, "table does not exist")),
            Some(schema) if schema.primary_key.is_empty() => {
                Err(SyncError::schema(table, "no primary key declared"))
            }
            Some(schema) => {
                debug!(
                    table,
                    primary_key = ?schema.primary_key,
                    foreign_keys = schema.foreign_keys.len(),
                    "Introspected table"
                );
                Ok(schema)
            }
        }
    }
}

#[async_trait]
impl RowSource for SqliteStore {
    async fn stream_rows(&self, table: &str) -> Result<RowStream> {
        let sql = format!("SELECT * FROM {}", quote_identifier(table)?);
        let (tx, rx) = mpsc::channel::<Result<Row>>(self.channel_capacity);
        let pool = self.pool.clone();
        let table = table.to_string();

        tokio::task::spawn_blocking(move || {
            let scanned = pool.with_conn(|conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns = rows::result_columns(&stmt);
                let mut cursor = stmt.query([])?;
                let mut count = 0usize;
                while let Some(raw) = cursor.next()? {
                    let row = rows::read_row(raw, &columns)?;
                    if tx.blocking_send(Ok(row)).is_err() {
                        debug!(%table, "Row consumer went away, stopping scan");
                        break;
                    }
                    count += 1;
                }
                Ok(count)
            });

            match scanned {
                Ok(count) => debug!(%table, rows = count, "Table scan finished"),
                Err(e) => {
                    let err = anyhow::Error::new(e).context(format!("Failed to scan table '{}'", table));
                    let _ = tx.blocking_send(Err(err));
                }
            }
        });

        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed())
    }

    async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        self.pool
            .run(move |conn| rows::query_all(conn, &sql))
            .await
            .context("Query passthrough failed")
    }

    async fn find_one(&self, table: &str, key: &Row) -> Result<Option<Row>> {
        let mut sql = format!("SELECT * FROM {}", quote_identifier(table)?);
        let mut params = Vec::with_capacity(key.len());
        for (i, (column, value)) in key.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("{} = ?{}", quote_identifier(column)?, i + 1));
            params.push(rows::to_sql(value));
        }
        sql.push_str(" LIMIT 1");

        let found = self
            .pool
            .run(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns = rows::result_columns(&stmt);
                let mut cursor = stmt.query(params_from_iter(params.iter()))?;
                let row = match cursor.next()? {
                    Some(raw) => Some(rows::read_row(raw, &columns)?),
                    None => None,
                };
                Ok(row)
            })
            .await
            .with_context(|| format!("Failed to look up row in '{}'", table))?;
        Ok(found)
    }
}
