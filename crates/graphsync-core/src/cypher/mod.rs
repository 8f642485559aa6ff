//! Cypher statement generation.
//!
//! Statements are fully inlined text: there is no parameter binding, so the
//! literal escaping below is the only protection against injection through
//! row values. Identifiers that are not plain words are back-tick quoted.

pub mod node;
pub mod relationship;

use std::borrow::Cow;

use chrono::SecondsFormat;

use crate::row::Value;

pub use node::{generate_node, node_statement};
pub use relationship::{generate_relationships, RelationshipBatch};

/// Render a value as a Cypher literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => float_literal(*f),
        Value::Text(s) => quote(s),
        Value::Timestamp(ts) => quote(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

fn float_literal(f: f64) -> String {
    if f.is_nan() {
        "0.0/0.0".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "1.0/0.0" } else { "-1.0/0.0" }.to_string()
    } else {
        // Debug keeps the decimal point on integral floats (`1.0`).
        format!("{:?}", f)
    }
}

/// Single-quote a string, escaping backslashes and quotes.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Plain `[A-Za-z_][A-Za-z0-9_]*` identifiers pass through; anything else is
/// back-tick quoted with embedded back-ticks doubled.
pub fn identifier(name: &str) -> Cow<'_, str> {
    if crate::pattern::is_alias(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("`{}`", name.replace('`', "``")))
    }
}

/// `:Label1:Label2`, in the order given.
pub fn label_chain(labels: &[String]) -> String {
    let mut out = String::new();
    for label in labels {
        out.push(':');
        out.push_str(&identifier(label));
    }
    out
}
