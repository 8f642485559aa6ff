//! Relationship MATCH + MERGE statements.
//!
//! ```cypher
//! MATCH (this:Book), (author:Person:Author) WHERE this.id = 2 AND author.id = 1 MERGE (this)-[:HAS_AUTHOR]->(author);
//! ```
//!
//! `this` resolves to the row's own table. Any other alias names a foreign
//! key of the table; it resolves to the referenced table, matched on that
//! table's primary key with values taken from the local foreign-key columns.
//! Each value is rendered with the declared type of the column it is compared
//! against, so `books.author_id TEXT '1'` still matches `authors.id = 1`.

use tracing::debug;

use super::{identifier, label_chain, literal};
use crate::error::{SyncError, SyncResult};
use crate::pattern::{RelationshipPattern, THIS};
use crate::registry::{TableDefinition, TableRegistry};
use crate::row::{Row, RowKey, Value};
use crate::schema::ColumnType;

/// Outcome of generating every pattern of one row.
///
/// A failing pattern never removes the statements of the others.
#[derive(Debug, Default)]
pub struct RelationshipBatch {
    /// One statement per successful pattern, in pattern order.
    pub statements: Vec<String>,
    /// Patterns with a null foreign key (nothing to link).
    pub skipped: usize,
    pub errors: Vec<SyncError>,
}

impl RelationshipBatch {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// The statements, or the first error if any pattern failed.
    pub fn into_result(self) -> SyncResult<Vec<String>> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.statements),
        }
    }
}

/// Build the relationship statements for `row` of a registered table.
pub fn generate_relationships(
    registry: &TableRegistry,
    table: &str,
    row: &Row,
) -> SyncResult<RelationshipBatch> {
    let definition = registry.get(table).ok_or_else(|| SyncError::UnknownTable {
        table: table.to_string(),
        key: row.leading_key(),
    })?;
    let key = definition.row_key(row);

    let mut batch = RelationshipBatch::default();
    for pattern in definition.relationships(row) {
        match relationship_statement(registry, definition, row, &key, &pattern) {
            Ok(Some(statement)) => batch.statements.push(statement),
            Ok(None) => {
                debug!(table, row = %key, pattern = %pattern, "Null foreign key, relationship skipped");
                batch.skipped += 1;
            }
            Err(err) => batch.errors.push(err),
        }
    }
    Ok(batch)
}

struct Endpoint<'a> {
    alias: &'a str,
    labels: Vec<String>,
    predicates: Vec<(String, Value)>,
}

fn relationship_statement(
    registry: &TableRegistry,
    definition: &TableDefinition,
    row: &Row,
    key: &RowKey,
    pattern: &RelationshipPattern,
) -> SyncResult<Option<String>> {
    let descriptor = pattern.parse().map_err(|source| SyncError::PatternSyntax {
        table: definition.table_name.clone(),
        key: key.clone(),
        source,
    })?;

    if descriptor.from == descriptor.to {
        return Err(invalid_alias(
            definition,
            &descriptor.from,
            key,
            "both endpoints use the same alias",
        ));
    }

    let Some(from) = resolve(registry, definition, row, key, &descriptor.from)? else {
        return Ok(None);
    };
    let Some(to) = resolve(registry, definition, row, key, &descriptor.to)? else {
        return Ok(None);
    };

    let predicates = [&from, &to]
        .into_iter()
        .flat_map(|endpoint| {
            endpoint.predicates.iter().map(move |(column, value)| {
                format!("{}.{} = {}", endpoint.alias, identifier(column), literal(value))
            })
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    Ok(Some(format!(
        "MATCH ({}{}), ({}{}) WHERE {} MERGE ({})-[:{}]->({});",
        from.alias,
        label_chain(&from.labels),
        to.alias,
        label_chain(&to.labels),
        predicates,
        from.alias,
        descriptor.rel_type,
        to.alias,
    )))
}

/// Resolve an alias to labels and key predicates. `None` when a foreign-key
/// value is null.
fn resolve<'a>(
    registry: &TableRegistry,
    definition: &TableDefinition,
    row: &Row,
    key: &RowKey,
    alias: &'a str,
) -> SyncResult<Option<Endpoint<'a>>> {
    if alias == THIS {
        let labels = definition.labels(row);
        if labels.is_empty() {
            return Err(SyncError::EmptyLabels {
                table: definition.table_name.clone(),
                key: key.clone(),
            });
        }
        let mut predicates = Vec::with_capacity(definition.primary_key.len());
        for column in &definition.primary_key {
            let value = required(definition, row, key, column)?;
            predicates.push((column.clone(), typed(value, definition.column_type(column))));
        }
        return Ok(Some(Endpoint {
            alias,
            labels,
            predicates,
        }));
    }

    let fk = definition
        .foreign_key(alias)
        .ok_or_else(|| invalid_alias(definition, alias, key, "not 'this' and not a declared foreign key"))?;
    let foreign = registry.get(&fk.foreign_table).ok_or_else(|| {
        invalid_alias(
            definition,
            alias,
            key,
            &format!("referenced table '{}' is not registered", fk.foreign_table),
        )
    })?;

    let mut key_row = Row::with_capacity(foreign.primary_key.len());
    for pk in &foreign.primary_key {
        let local = if *pk == fk.foreign_column {
            fk
        } else {
            definition
                .foreign_keys
                .iter()
                .find(|f| f.constraint == fk.constraint && f.foreign_column == *pk)
                .ok_or_else(|| {
                    invalid_alias(
                        definition,
                        alias,
                        key,
                        &format!("its foreign key does not cover '{}.{}'", fk.foreign_table, pk),
                    )
                })?
        };
        let value = required(definition, row, key, &local.local_column)?;
        if value.is_null() {
            return Ok(None);
        }
        key_row.insert(pk.clone(), typed(value, foreign.column_type(pk)));
    }

    let labels = foreign.labels(&key_row);
    if labels.is_empty() {
        return Err(SyncError::EmptyLabels {
            table: foreign.table_name.clone(),
            key: foreign.row_key(&key_row),
        });
    }

    Ok(Some(Endpoint {
        alias,
        labels,
        predicates: key_row.into_iter().collect(),
    }))
}

fn required<'r>(
    definition: &TableDefinition,
    row: &'r Row,
    key: &RowKey,
    column: &str,
) -> SyncResult<&'r Value> {
    row.get(column).ok_or_else(|| SyncError::MissingColumn {
        table: definition.table_name.clone(),
        column: column.to_string(),
        key: key.clone(),
    })
}

fn typed(value: &Value, ty: Option<ColumnType>) -> Value {
    match ty {
        Some(ty) => value.coerce(ty),
        None => value.clone(),
    }
}

fn invalid_alias(definition: &TableDefinition, alias: &str, key: &RowKey, reason: &str) -> SyncError {
    SyncError::InvalidAlias {
        table: definition.table_name.clone(),
        alias: alias.to_string(),
        key: key.clone(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TableSpec;
    use crate::testing::{library_registry, library_schemas};

    const HAS_AUTHOR: &str =
        "MATCH (this:Book), (author:Person:Author) WHERE this.id = 2 AND author.id = 1 MERGE (this)-[:HAS_AUTHOR]->(author);";

    fn gatsby() -> Row {
        Row::new().with("id", 2).with("title", "The Great Gatsby").with("author_id", 1)
    }

    #[tokio::test]
    async fn test_this_to_foreign_key() {
        let registry = library_registry().await;

        let statements = generate_relationships(&registry, "books", &gatsby())
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(statements, vec![HAS_AUTHOR]);
    }

    #[tokio::test]
    async fn test_left_arrow_and_structured_forms_agree() {
        let source = library_schemas();
        let mut registry = library_registry().await;
        registry
            .register(
                TableSpec::new("novels")
                    .static_labels(["Book"])
                    .all_properties()
                    .relationships(|_| {
                        vec![
                            "(author)<-[:HAS_AUTHOR]-(this)".into(),
                            RelationshipPattern::structured("this", "author", "HAS_AUTHOR"),
                        ]
                    }),
                &source,
            )
            .await
            .unwrap();

        let statements = generate_relationships(&registry, "novels", &gatsby())
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(statements, vec![HAS_AUTHOR, HAS_AUTHOR]);
    }

    #[tokio::test]
    async fn test_foreign_value_uses_referenced_column_type() {
        let source = library_schemas();
        let mut registry = library_registry().await;
        registry
            .register(
                TableSpec::new("loans")
                    .static_labels(["Loan"])
                    .all_properties()
                    .relationships(|_| vec!["(this)-[:OF_BOOK]->(book)".into()]),
                &source,
            )
            .await
            .unwrap();
        // loans.id is TEXT, loans.book_id is TEXT referencing books.id INTEGER.
        let row = Row::new().with("id", 10).with("book_id", "2");

        let statements = generate_relationships(&registry, "loans", &row)
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(
            statements,
            vec!["MATCH (this:Loan), (book:Book) WHERE this.id = '10' AND book.id = 2 MERGE (this)-[:OF_BOOK]->(book);"]
        );
    }

    #[tokio::test]
    async fn test_composite_keys_follow_key_order() {
        let source = library_schemas();
        let mut registry = library_registry().await;
        registry
            .register(TableSpec::new("editions").static_labels(["Edition"]).all_properties(), &source)
            .await
            .unwrap();
        registry
            .register(
                TableSpec::new("reprints")
                    .static_labels(["Reprint"])
                    .all_properties()
                    .relationships(|_| vec!["(this)-[:REPRINT_OF]->(edition_book)".into()]),
                &source,
            )
            .await
            .unwrap();
        let row = Row::new()
            .with("id", 5)
            .with("edition_number", 3)
            .with("edition_book", 2);

        let statements = generate_relationships(&registry, "reprints", &row)
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "MATCH (this:Reprint), (edition_book:Edition) WHERE this.id = 5 AND edition_book.book_id = 2 AND edition_book.number = 3 MERGE (this)-[:REPRINT_OF]->(edition_book);"
            ]
        );
    }

    #[tokio::test]
    async fn test_two_composite_keys_to_one_table() {
        let source = library_schemas();
        let mut registry = library_registry().await;
        registry
            .register(TableSpec::new("editions").static_labels(["Edition"]).all_properties(), &source)
            .await
            .unwrap();
        registry
            .register(
                TableSpec::new("swaps")
                    .static_labels(["Swap"])
                    .all_properties()
                    .relationships(|_| {
                        vec![
                            "(this)-[:FROM]->(from_book)".into(),
                            "(this)-[:TO]->(to_number)".into(),
                        ]
                    }),
                &source,
            )
            .await
            .unwrap();
        let row = Row::new()
            .with("id", 1)
            .with("from_book", 10)
            .with("from_number", 1)
            .with("to_book", 20)
            .with("to_number", 2);

        let statements = generate_relationships(&registry, "swaps", &row)
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(
            statements,
            vec![
                "MATCH (this:Swap), (from_book:Edition) WHERE this.id = 1 AND from_book.book_id = 10 AND from_book.number = 1 MERGE (this)-[:FROM]->(from_book);",
                "MATCH (this:Swap), (to_number:Edition) WHERE this.id = 1 AND to_number.book_id = 20 AND to_number.number = 2 MERGE (this)-[:TO]->(to_number);",
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_pattern_keeps_other_statements() {
        let source = library_schemas();
        let mut registry = library_registry().await;
        registry
            .register(
                TableSpec::new("novels")
                    .static_labels(["Book"])
                    .all_properties()
                    .relationships(|_| {
                        vec![
                            "(this)-[:HAS_AUTHOR]->(author)".into(),
                            "(this)-[HAS_AUTHOR]->(author)".into(),
                            "(this)-[:WRITTEN_BY]->(writer)".into(),
                            "(author)-[:WROTE]->(this)".into(),
                        ]
                    }),
                &source,
            )
            .await
            .unwrap();

        let batch = generate_relationships(&registry, "novels", &gatsby()).unwrap();

        assert_eq!(batch.statements.len(), 2);
        assert_eq!(batch.statements[0], HAS_AUTHOR);
        assert!(batch.statements[1].ends_with("MERGE (author)-[:WROTE]->(this);"));
        assert_eq!(batch.errors.len(), 2);
        assert!(matches!(batch.errors[0], SyncError::PatternSyntax { .. }));
        match &batch.errors[1] {
            SyncError::InvalidAlias { table, alias, key, .. } => {
                assert_eq!(table, "novels");
                assert_eq!(alias, "writer");
                assert_eq!(key.to_string(), "id=2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_null_foreign_key_is_skipped() {
        let registry = library_registry().await;
        let row = Row::new().with("id", 3).with("title", "Anonymous").with("author_id", Value::Null);

        let batch = generate_relationships(&registry, "books", &row).unwrap();

        assert!(batch.is_ok());
        assert!(batch.statements.is_empty());
        assert_eq!(batch.skipped, 1);
    }

    #[tokio::test]
    async fn test_missing_foreign_key_column() {
        let registry = library_registry().await;
        let row = Row::new().with("id", 2);

        let err = generate_relationships(&registry, "books", &row)
            .unwrap()
            .into_result()
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingColumn { ref column, .. } if column == "author_id"));
    }

    #[tokio::test]
    async fn test_unregistered_foreign_table() {
        let source = library_schemas();
        let mut registry = crate::registry::TableRegistry::new();
        registry
            .register(
                TableSpec::new("books")
                    .static_labels(["Book"])
                    .all_properties()
                    .relationships(|_| vec!["(this)-[:HAS_AUTHOR]->(author)".into()]),
                &source,
            )
            .await
            .unwrap();

        let err = generate_relationships(&registry, "books", &gatsby())
            .unwrap()
            .into_result()
            .unwrap_err();

        assert!(matches!(err, SyncError::InvalidAlias { ref alias, .. } if alias == "author"));
    }

    #[tokio::test]
    async fn test_foreign_labels_see_only_key_columns() {
        let source = library_schemas();
        let mut registry = crate::registry::TableRegistry::new();
        registry
            .register(
                TableSpec::new("authors")
                    .labels(|row| {
                        let mut labels = vec!["Person".to_string()];
                        if let Some(kind) = row.get("kind").and_then(Value::as_str) {
                            labels.push(kind.to_string());
                        }
                        labels
                    })
                    .all_properties(),
                &source,
            )
            .await
            .unwrap();
        registry.register(crate::testing::books_spec(), &source).await.unwrap();

        let statements = generate_relationships(&registry, "books", &gatsby())
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(
            statements,
            vec!["MATCH (this:Book), (author:Person) WHERE this.id = 2 AND author.id = 1 MERGE (this)-[:HAS_AUTHOR]->(author);"]
        );
    }

    #[tokio::test]
    async fn test_table_without_relationships() {
        let registry = library_registry().await;
        let row = Row::new().with("id", 1).with("name", "F. Scott Fitzgerald");

        let batch = generate_relationships(&registry, "authors", &row).unwrap();

        assert!(batch.statements.is_empty());
        assert!(batch.errors.is_empty());
    }
}
