//! Conversion between SQLite values and graphsync rows.

use chrono::SecondsFormat;
use graphsync_core::{ColumnType, Row, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Batch, Connection, Statement};

use crate::pool::DbResult;

/// Result columns of a prepared statement with their declared type, if any.
pub fn result_columns(stmt: &Statement<'_>) -> Vec<(String, Option<ColumnType>)> {
    stmt.columns()
        .iter()
        .map(|c| (c.name().to_string(), c.decl_type().map(ColumnType::from_declared)))
        .collect()
}

/// Read one result row, typing each value by its column's declared type.
pub fn read_row(
    raw: &rusqlite::Row<'_>,
    columns: &[(String, Option<ColumnType>)],
) -> rusqlite::Result<Row> {
    let mut row = Row::with_capacity(columns.len());
    for (i, (name, ty)) in columns.iter().enumerate() {
        let value = from_sql(raw.get_ref(i)?);
        let value = match ty {
            Some(ty) => value.coerce(*ty),
            None => value,
        };
        row.insert(name.clone(), value);
    }
    Ok(row)
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Text(bytes.iter().map(|b| format!("{:02x}", b)).collect()),
    }
}

/// Bind parameter for a graphsync value.
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Timestamp(ts) => SqlValue::Text(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

/// Run arbitrary SQL. Every statement of a script is executed in order and
/// the rows of the last statement that produces columns are returned.
pub fn query_all(conn: &Connection, sql: &str) -> DbResult<Vec<Row>> {
    let mut batch = Batch::new(conn, sql);
    let mut rows = Vec::new();
    while let Some(mut stmt) = batch.next()? {
        let columns = result_columns(&stmt);
        let mut cursor = stmt.query([])?;
        let mut current = Vec::new();
        while let Some(raw) = cursor.next()? {
            current.push(read_row(raw, &columns)?);
        }
        if !columns.is_empty() {
            rows = current;
        }
    }
    Ok(rows)
}
