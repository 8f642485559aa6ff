//! # GraphSync Graph
//!
//! Neo4j sink for the statements generated by `graphsync-core`.

pub mod client;

pub use client::{GraphClient, GraphConfig, GraphCounts};
