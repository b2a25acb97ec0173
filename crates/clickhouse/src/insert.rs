//! Batch inserts into ClickHouse.

use crate::client::ClickHouseClient;
use async_trait::async_trait;
use clickhouse::insert::Insert;
use clickhouse::Row;
use etl_core::{AnalyticsEvent, ColumnarSink, Error, Result, SinkBatch};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

/// Row for the analytics table.
#[derive(Debug, Clone, PartialEq, Eq, Row, Serialize, Deserialize)]
pub struct AnalyticsRow {
    pub user_id: String,
    pub movie_id: String,
    pub timestamp_ms: i64,
}

impl From<&AnalyticsEvent> for AnalyticsRow {
    fn from(event: &AnalyticsEvent) -> Self {
        Self {
            user_id: event.user_id.clone(),
            movie_id: event.movie_id.clone(),
            timestamp_ms: event.timestamp_ms,
        }
    }
}

/// Columnar sink backed by ClickHouse HTTP inserts.
#[derive(Clone)]
pub struct ClickHouseSink {
    client: ClickHouseClient,
}

impl ClickHouseSink {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    /// Table named in the client configuration.
    pub fn default_target(&self) -> &str {
        &self.client.config().table
    }
}

/// An open ClickHouse insert.
///
/// Rows are streamed as they are appended, but ClickHouse only makes them
/// visible once the insert is ended; a dropped batch is aborted.
pub struct ClickHouseBatch {
    insert: Insert<AnalyticsRow>,
    table: String,
    rows: usize,
    started: Instant,
}

#[async_trait]
impl ColumnarSink for ClickHouseSink {
    type Batch = ClickHouseBatch;

    async fn prepare_batch(&self, target: &str) -> Result<ClickHouseBatch> {
        let timeout = Some(self.client.insert_timeout());

        let insert = self
            .client
            .inner()
            .insert::<AnalyticsRow>(target)
            .map_err(|e| Error::sink(format!("Insert error: {}", e)))?
            .with_timeouts(timeout, timeout);

        Ok(ClickHouseBatch {
            insert,
            table: target.to_string(),
            rows: 0,
            started: Instant::now(),
        })
    }
}

#[async_trait]
impl SinkBatch for ClickHouseBatch {
    async fn append(&mut self, event: &AnalyticsEvent) -> Result<()> {
        let row = AnalyticsRow::from(event);

        self.insert
            .write(&row)
            .await
            .map_err(|e| Error::sink(format!("Write error: {}", e)))?;

        self.rows += 1;
        Ok(())
    }

    async fn send(self) -> Result<usize> {
        let ClickHouseBatch {
            insert,
            table,
            rows,
            started,
        } = self;

        insert
            .end()
            .await
            .map_err(|e| Error::sink(format!("End error: {}", e)))?;

        let elapsed = started.elapsed();
        metrics().flush_latency_ms.observe(elapsed.as_millis() as u64);

        debug!(
            table = %table,
            rows = rows,
            latency_ms = %elapsed.as_millis(),
            "Inserted analytics rows"
        );

        Ok(rows)
    }
}
