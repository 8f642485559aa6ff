//! # GraphSync Core
//!
//! Maps relational rows onto a property graph.
//!
//! Tables are registered with caller-supplied mapping rules (labels,
//! properties, relationship patterns); primary and foreign keys are discovered
//! from the catalog. The engine then generates idempotent Cypher MERGE
//! statements per row and drives a two-phase full load: every node first,
//! then every relationship.

pub mod cypher;
pub mod engine;
pub mod error;
pub mod load;
pub mod pattern;
pub mod registry;
pub mod row;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testing;

pub use cypher::RelationshipBatch;
pub use engine::GraphSync;
pub use error::{SyncError, SyncResult};
pub use load::{ErrorMode, LoadOptions, LoadReport, TableReport};
pub use pattern::{RelationshipDescriptor, RelationshipPattern};
pub use registry::{TableDefinition, TableRegistry, TableSpec};
pub use row::{Row, RowKey, Value};
pub use schema::{ColumnType, ForeignKeyDef, ForeignKeyRef, SchemaIntrospector, TableSchema};
pub use store::{GraphSink, MemorySink, RowSource, RowStream};
