//! Catalog introspection through SQLite's table-valued pragma functions.

use graphsync_core::{ColumnType, ForeignKeyRef, TableSchema};
use rusqlite::{params, Connection};
use tracing::warn;

use crate::pool::DbResult;

/// One row of `pragma_table_info`.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    /// 1-based position within the primary key, 0 when not part of it.
    pub pk_position: i64,
}

/// One row of `pragma_foreign_key_list`.
#[derive(Debug, Clone)]
pub struct ForeignKeyInfo {
    pub id: i64,
    pub seq: i64,
    pub table: String,
    pub from: String,
    /// `None` when declared as `REFERENCES other` without a column list.
    pub to: Option<String>,
}

pub fn columns(conn: &Connection, table: &str) -> DbResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;

    let rows = stmt.query_map(params![table], |row| {
        Ok(ColumnInfo {
            name: row.get(0)?,
            declared_type: row.get(1)?,
            pk_position: row.get(2)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn foreign_keys(conn: &Connection, table: &str) -> DbResult<Vec<ForeignKeyInfo>> {
    let mut stmt = conn.prepare(
        "SELECT id, seq, \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;

    let rows = stmt.query_map(params![table], |row| {
        Ok(ForeignKeyInfo {
            id: row.get(0)?,
            seq: row.get(1)?,
            table: row.get(2)?,
            from: row.get(3)?,
            to: row.get(4)?,
        })
    })?;

    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Primary-key columns of `table` in key order.
pub fn primary_key(columns: &[ColumnInfo]) -> Vec<String> {
    let mut pk: Vec<&ColumnInfo> = columns.iter().filter(|c| c.pk_position > 0).collect();
    pk.sort_by_key(|c| c.pk_position);
    pk.into_iter().map(|c| c.name.clone()).collect()
}

/// Describe `table`. `None` when the table does not exist; the primary key
/// is empty when none is declared.
pub fn table_schema(conn: &Connection, table: &str) -> DbResult<Option<TableSchema>> {
    let columns = columns(conn, table)?;
    if columns.is_empty() {
        return Ok(None);
    }

    let mut foreign = Vec::new();
    for fk in foreign_keys(conn, table)? {
        let foreign_column = match fk.to {
            Some(column) => column,
            // Implicit reference: the referenced table's key column at the same position.
            None => {
                let referenced = primary_key(&self::columns(conn, &fk.table)?);
                match referenced.into_iter().nth(fk.seq as usize) {
                    Some(column) => column,
                    None => {
                        warn!(
                            table,
                            column = %fk.from,
                            referenced = %fk.table,
                            position = fk.seq,
                            "Implicit reference has no key column at this position, foreign key ignored"
                        );
                        continue;
                    }
                }
            }
        };
        foreign.push(ForeignKeyRef {
            constraint: fk.id,
            column: fk.from,
            foreign_table: fk.table,
            foreign_column,
        });
    }

    Ok(Some(TableSchema {
        table: table.to_string(),
        primary_key: primary_key(&columns),
        foreign_keys: foreign,
        column_types: columns
            .iter()
            .map(|c| (c.name.clone(), ColumnType::from_declared(&c.declared_type)))
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbPool;

    fn pool() -> DbPool {
        let pool = DbPool::in_memory().unwrap();
        pool.execute_batch(
            "CREATE TABLE authors (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, author_id INTEGER REFERENCES authors(id));
             CREATE TABLE editions (number INTEGER, book_id INTEGER REFERENCES books, PRIMARY KEY (book_id, number));
             CREATE TABLE reprints (
                 id INTEGER PRIMARY KEY,
                 edition_book INTEGER,
                 edition_number INTEGER,
                 FOREIGN KEY (edition_book, edition_number) REFERENCES editions (book_id, number)
             );
             CREATE TABLE tags (name TEXT);
             CREATE TABLE taggings (id INTEGER PRIMARY KEY, tag_name TEXT REFERENCES tags, book_id INTEGER REFERENCES books(id));",
        )
        .unwrap();
        pool
    }

    #[test]
    fn test_simple_foreign_key() {
        let schema = pool()
            .with_conn(|conn| table_schema(conn, "books"))
            .unwrap()
            .unwrap();

        assert_eq!(schema.primary_key, vec!["id"]);
        assert_eq!(
            schema.foreign_keys,
            vec![ForeignKeyRef {
                constraint: 0,
                column: "author_id".to_string(),
                foreign_table: "authors".to_string(),
                foreign_column: "id".to_string(),
            }]
        );
        assert_eq!(schema.column_type("title"), Some(ColumnType::Text));
    }

    #[test]
    fn test_composite_primary_key_order() {
        let schema = pool()
            .with_conn(|conn| table_schema(conn, "editions"))
            .unwrap()
            .unwrap();

        assert_eq!(schema.primary_key, vec!["book_id", "number"]);
        // `REFERENCES books` without a column resolves to books' key.
        assert_eq!(schema.foreign_keys[0].foreign_column, "id");
    }

    #[test]
    fn test_composite_foreign_key() {
        let schema = pool()
            .with_conn(|conn| table_schema(conn, "reprints"))
            .unwrap()
            .unwrap();

        let pairs: Vec<(&str, &str)> = schema
            .foreign_keys
            .iter()
            .map(|fk| (fk.column.as_str(), fk.foreign_column.as_str()))
            .collect();
        assert_eq!(pairs, vec![("edition_book", "book_id"), ("edition_number", "number")]);
    }

    #[test]
    fn test_missing_table_and_missing_key() {
        let pool = pool();

        assert!(pool.with_conn(|conn| table_schema(conn, "nope")).unwrap().is_none());
        let tags = pool.with_conn(|conn| table_schema(conn, "tags")).unwrap().unwrap();
        assert!(tags.primary_key.is_empty());
    }

    #[test]
    fn test_unresolvable_implicit_reference_is_ignored() {
        let schema = pool()
            .with_conn(|conn| table_schema(conn, "taggings"))
            .unwrap()
            .unwrap();

        let columns: Vec<&str> = schema.foreign_keys.iter().map(|fk| fk.column.as_str()).collect();
        assert_eq!(columns, vec!["book_id"]);
    }

    #[test]
    fn test_composite_foreign_keys_keep_their_constraint() {
        let pool = pool();
        pool.execute_batch(
            "CREATE TABLE swaps (
                 id INTEGER PRIMARY KEY,
                 from_book INTEGER, from_number INTEGER,
                 to_book INTEGER, to_number INTEGER,
                 FOREIGN KEY (from_book, from_number) REFERENCES editions (book_id, number),
                 FOREIGN KEY (to_book, to_number) REFERENCES editions (book_id, number)
             );",
        )
        .unwrap();

        let schema = pool.with_conn(|conn| table_schema(conn, "swaps")).unwrap().unwrap();

        let constraint = |column: &str| {
            schema
                .foreign_keys
                .iter()
                .find(|fk| fk.column == column)
                .map(|fk| fk.constraint)
                .unwrap()
        };
        assert_eq!(constraint("from_book"), constraint("from_number"));
        assert_eq!(constraint("to_book"), constraint("to_number"));
        assert_ne!(constraint("from_book"), constraint("to_book"));
    }
}
