//! SQLite connection handling.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Connection(#[from] rusqlite::Error),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Blocking database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// A shared SQLite connection. Cloning is cheap; all clones use the same
/// connection, one caller at a time.
#[derive(Clone)]
pub struct DbPool {
    conn: Arc<Mutex<Connection>>,
}

impl DbPool {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn))
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with the connection on the current thread.
    pub fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&conn)
    }

    /// Run `f` with the connection on tokio's blocking pool.
    pub async fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.with_conn(f)).await?
    }

    /// Execute one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch(sql)?;
            Ok(())
        })
    }
}
