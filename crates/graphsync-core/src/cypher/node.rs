//! Node MERGE statements.
//!
//! ```cypher
//! MERGE (:Person:Author {id: 1, name: 'F. Scott Fitzgerald'});
//! ```
//!
//! MERGE matches on the full label and property pattern. A row whose
//! properties changed since the last sync therefore merges a *new* node
//! instead of updating the old one; full-pattern MERGE accepts that.

use super::{identifier, label_chain, literal};
use crate::error::{SyncError, SyncResult};
use crate::registry::TableRegistry;
use crate::row::Row;

/// Build the MERGE statement for `row` of a registered table.
pub fn generate_node(registry: &TableRegistry, table: &str, row: &Row) -> SyncResult<String> {
    let definition = registry.get(table).ok_or_else(|| SyncError::UnknownTable {
        table: table.to_string(),
        key: row.leading_key(),
    })?;

    let labels = definition.labels(row);
    if labels.is_empty() {
        return Err(SyncError::EmptyLabels {
            table: table.to_string(),
            key: definition.row_key(row),
        });
    }
    let properties = definition.properties(row);

    Ok(node_statement(&labels, &properties))
}

/// `MERGE (:L1:L2 {k1: v1, k2: v2});` with labels and properties in the order given.
pub fn node_statement(labels: &[String], properties: &Row) -> String {
    let mut out = String::from("MERGE (");
    out.push_str(&label_chain(labels));

    if !properties.is_empty() {
        out.push_str(" {");
        for (i, (key, value)) in properties.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&identifier(key));
            out.push_str(": ");
            out.push_str(&literal(value));
        }
        out.push('}');
    }

    out.push_str(");");
    out
}
