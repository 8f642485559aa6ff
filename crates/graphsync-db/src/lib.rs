//! SQLite relational source for graphsync.
//!
//! [`SqliteStore`] discovers table keys from SQLite's catalog pragmas and
//! streams rows to the load orchestrator from tokio's blocking pool.

pub mod catalog;
pub mod pool;
pub mod rows;
pub mod store;

pub use pool::{DbError, DbPool, DbResult};
pub use store::SqliteStore;

/// Open a SQLite database file as a relational source.
pub fn open(path: impl AsRef<std::path::Path>) -> DbResult<SqliteStore> {
    SqliteStore::open(path)
}
