//! Two-phase full synchronization.
//!
//! Phase one merges the nodes of every registered table; phase two merges
//! the relationships. The phase boundary is global: no relationship statement
//! is sent before every table's node pass has finished, so both endpoints of
//! every relationship already exist and tables need no dependency ordering.
//!
//! Within a phase, rows may be processed concurrently. MERGE statements on
//! distinct rows commute, so no ordering is promised inside a phase.

use std::fmt;

use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cypher;
use crate::error::{SyncError, SyncResult};
use crate::registry::{TableDefinition, TableRegistry};
use crate::row::Row;
use crate::store::{GraphSink, RowSource};

/// What to do when a row fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorMode {
    /// Abort the run on the first failed row.
    #[default]
    FailFast,
    /// Record the failure in the report and keep going.
    Collect,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Maximum statements in flight per table. `1` is strictly sequential.
    pub concurrency: usize,
    pub error_mode: ErrorMode,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            error_mode: ErrorMode::FailFast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Nodes,
    Relationships,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Nodes => f.write_str("nodes"),
            Phase::Relationships => f.write_str("relationships"),
        }
    }
}

/// Counts for one table across both phases.
#[derive(Debug, Clone, Default)]
pub struct TableReport {
    pub table: String,
    pub rows: usize,
    pub nodes: usize,
    pub relationships: usize,
}

/// Result of a load run.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub nodes: usize,
    pub relationships: usize,
    /// Relationship patterns skipped because of a null foreign key.
    pub skipped: usize,
    /// Row failures recorded in [`ErrorMode::Collect`].
    pub errors: Vec<SyncError>,
    pub tables: Vec<TableReport>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Default)]
struct RowOutcome {
    nodes: usize,
    relationships: usize,
    skipped: usize,
    errors: Vec<SyncError>,
}

/// Run both phases over every registered table.
pub async fn init_load<S, G>(
    registry: &TableRegistry,
    source: &S,
    graph: &G,
    options: &LoadOptions,
) -> SyncResult<LoadReport>
where
    S: RowSource + ?Sized,
    G: GraphSink + ?Sized,
{
    let mut report = LoadReport {
        tables: registry
            .iter()
            .map(|definition| TableReport {
                table: definition.table_name.clone(),
                ..TableReport::default()
            })
            .collect(),
        ..LoadReport::default()
    };

    info!(
        tables = registry.len(),
        concurrency = options.concurrency,
        error_mode = ?options.error_mode,
        "Starting initial load"
    );

    for phase in [Phase::Nodes, Phase::Relationships] {
        for (position, definition) in registry.iter().enumerate() {
            load_table(phase, registry, definition, source, graph, options, &mut report, position)
                .await?;
        }
        info!(
            %phase,
            nodes = report.nodes,
            relationships = report.relationships,
            errors = report.errors.len(),
            "Phase complete"
        );
    }

    info!(
        nodes = report.nodes,
        relationships = report.relationships,
        skipped = report.skipped,
        errors = report.errors.len(),
        "Initial load complete"
    );
    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn load_table<S, G>(
    phase: Phase,
    registry: &TableRegistry,
    definition: &TableDefinition,
    source: &S,
    graph: &G,
    options: &LoadOptions,
    report: &mut LoadReport,
    position: usize,
) -> SyncResult<()>
where
    S: RowSource + ?Sized,
    G: GraphSink + ?Sized,
{
    let table = definition.table_name.as_str();
    if phase == Phase::Relationships && !definition.has_relationships() {
        debug!(table, "No relationship mapping, skipping scan");
        return Ok(());
    }

    let rows = source
        .stream_rows(table)
        .await
        .map_err(|e| SyncError::relational(table, e))?;

    let mut outcomes = rows
        .map(|row| async move {
            let row = row.map_err(|e| SyncError::relational(table, e))?;
            Ok::<_, SyncError>(apply_row(phase, registry, definition, &row, graph).await)
        })
        .buffer_unordered(options.concurrency.max(1));

    let mut rows_seen = 0;
    while let Some(outcome) = outcomes.next().await {
        let outcome = outcome?;
        rows_seen += 1;

        let table_report = &mut report.tables[position];
        table_report.nodes += outcome.nodes;
        table_report.relationships += outcome.relationships;
        report.nodes += outcome.nodes;
        report.relationships += outcome.relationships;
        report.skipped += outcome.skipped;

        for err in outcome.errors {
            match options.error_mode {
                ErrorMode::FailFast => return Err(err),
                ErrorMode::Collect => {
                    warn!(error = %err, "Row failed, continuing");
                    report.errors.push(err);
                }
            }
        }
    }

    if phase == Phase::Nodes {
        report.tables[position].rows = rows_seen;
    }
    info!(table, %phase, rows = rows_seen, "Table loaded");
    Ok(())
}

async fn apply_row<G>(
    phase: Phase,
    registry: &TableRegistry,
    definition: &TableDefinition,
    row: &Row,
    graph: &G,
) -> RowOutcome
where
    G: GraphSink + ?Sized,
{
    let table = definition.table_name.as_str();
    let mut outcome = RowOutcome::default();

    match phase {
        Phase::Nodes => match cypher::generate_node(registry, table, row) {
            Ok(statement) => match execute(graph, definition, row, statement).await {
                Ok(()) => outcome.nodes += 1,
                Err(err) => outcome.errors.push(err),
            },
            Err(err) => outcome.errors.push(err),
        },
        Phase::Relationships => match cypher::generate_relationships(registry, table, row) {
            Ok(batch) => {
                outcome.skipped = batch.skipped;
                outcome.errors = batch.errors;
                for statement in batch.statements {
                    match execute(graph, definition, row, statement).await {
                        Ok(()) => outcome.relationships += 1,
                        Err(err) => outcome.errors.push(err),
                    }
                }
            }
            Err(err) => outcome.errors.push(err),
        },
    }
    outcome
}

async fn execute<G>(graph: &G, definition: &TableDefinition, row: &Row, statement: String) -> SyncResult<()>
where
    G: GraphSink + ?Sized,
{
    debug!(table = %definition.table_name, %statement, "Executing");
    graph.run(&statement).await.map_err(|source| SyncError::Graph {
        table: definition.table_name.clone(),
        key: definition.row_key(row),
        statement,
        source,
    })
}
