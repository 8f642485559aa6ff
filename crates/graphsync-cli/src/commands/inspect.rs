//! Catalog introspection for one table.

use anyhow::Result;
use graphsync_core::SchemaIntrospector;

use super::open_store;
use crate::config::Config;
use crate::output;

pub async fn execute(config: &Config, table: &str) -> Result<()> {
    let store = open_store(config)?;
    let schema = store.introspect(table).await?;
    output::print_schema(&schema);
    Ok(())
}
