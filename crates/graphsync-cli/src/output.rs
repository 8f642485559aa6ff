//! Terminal output formatting.

use colored::Colorize;
use graphsync_core::{ForeignKeyDef, LoadReport, Row, SyncError, TableSchema, Value};
use serde_json::json;

/// Print generated statements, one per line.
pub fn print_statements(statements: &[String]) {
    if statements.is_empty() {
        println!("{}", "No statements.".dimmed());
        return;
    }

    for statement in statements {
        let colored = if statement.starts_with("MATCH") {
            statement.yellow()
        } else {
            statement.cyan()
        };
        println!("{}", colored);
    }
}

pub fn print_report(report: &LoadReport) {
    let heading = if report.is_clean() {
        "Sync complete:".green().bold()
    } else {
        "Sync finished with errors:".red().bold()
    };
    println!("\n{}", heading);
    println!("  Nodes merged:          {}", report.nodes);
    println!("  Relationships merged:  {}", report.relationships);
    if report.skipped > 0 {
        println!("  Skipped (null key):    {}", report.skipped.to_string().yellow());
    }

    if !report.tables.is_empty() {
        println!();
        println!("{:<24} {:>8} {:>8} {:>14}", "Table", "Rows", "Nodes", "Relationships");
        println!("{}", "─".repeat(57));
        for table in &report.tables {
            println!(
                "{:<24} {:>8} {:>8} {:>14}",
                truncate(&table.table, 22),
                table.rows,
                table.nodes,
                table.relationships
            );
        }
    }

    if !report.errors.is_empty() {
        println!("\n{} ({}):", "Errors".red().bold(), report.errors.len());
        for (table, errors) in errors_by_table(&report.errors) {
            println!("  {} ({})", table.bold(), errors.len());
            for error in errors {
                let row = error.row_key().map(ToString::to_string).unwrap_or_default();
                println!("    {} {} {}", "✗".red(), row.yellow(), error);
            }
        }
    }
}

/// Errors grouped by table, tables in order of first failure.
fn errors_by_table(errors: &[SyncError]) -> Vec<(&str, Vec<&SyncError>)> {
    let mut groups: Vec<(&str, Vec<&SyncError>)> = Vec::new();
    for error in errors {
        match groups.iter_mut().find(|(table, _)| *table == error.table()) {
            Some((_, group)) => group.push(error),
            None => groups.push((error.table(), vec![error])),
        }
    }
    groups
}

/// Print query results as an aligned table.
pub fn print_rows(rows: &[Row]) {
    let Some(first) = rows.first() else {
        println!("{}", "No rows.".dimmed());
        return;
    };

    let columns: Vec<&str> = first.column_names().collect();
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
                .min(40)
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect();
    println!("{}", header.join("  ").bold());
    println!("{}", "─".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<w$}", truncate(v, *w), w = *w))
            .collect();
        println!("{}", line.join("  "));
    }
    println!("\n{} row(s)", rows.len().to_string().bold());
}

pub fn print_schema(schema: &TableSchema) {
    println!("{} {}", "Table".bold(), schema.table.cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}: {}", "Primary key".bold(), schema.primary_key.join(", ").yellow());

    println!("\n{}", "Columns".bold());
    for (name, ty) in &schema.column_types {
        let marker = if schema.primary_key.contains(name) { "*" } else { " " };
        println!("  {} {:<24} {}", marker.yellow(), name, format!("{:?}", ty).dimmed());
    }

    if schema.foreign_keys.is_empty() {
        println!("\n{}", "No foreign keys.".dimmed());
        return;
    }

    println!("\n{}", "Foreign keys".bold());
    for fk in &schema.foreign_keys {
        let def = ForeignKeyDef::from_ref(fk);
        println!(
            "  {:<16} {} {}.{} {}",
            def.alias.green(),
            fk.column,
            "→".dimmed(),
            fk.foreign_table,
            fk.foreign_column
        );
    }
}

pub fn rows_to_json(rows: &[Row]) -> serde_json::Value {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|(column, value)| (column.to_string(), value_to_json(value)))
                .collect::<serde_json::Map<_, _>>()
        })
        .map(serde_json::Value::Object)
        .collect()
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Text(s) => json!(s),
        Value::Timestamp(ts) => json!(ts.to_rfc3339()),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truncate a string for display, counting characters.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut)
}
