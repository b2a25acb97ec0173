//! ClickHouse health checks and schema bootstrap.

use crate::client::ClickHouseClient;
use crate::schema::create_analytics_table;
use etl_core::{Error, Result};
use tracing::{debug, error};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.inner().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Creates the analytics table if it does not exist.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    let table = &client.config().table;

    client
        .inner()
        .query(&create_analytics_table(table))
        .execute()
        .await
        .map_err(|e| Error::sink(format!("Schema init error: {}", e)))?;

    debug!(table = %table, "ClickHouse schema initialized");
    Ok(())
}
