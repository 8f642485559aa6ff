//! SQL passthrough.

use anyhow::Result;
use graphsync_core::RowSource;

use super::open_store;
use crate::config::Config;
use crate::output;

pub async fn execute(config: &Config, sql: &str, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let rows = store.query(sql).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output::rows_to_json(&rows))?);
    } else {
        output::print_rows(&rows);
    }
    Ok(())
}
