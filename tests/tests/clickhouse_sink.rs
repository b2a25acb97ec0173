//! ClickHouse sink tests against a real server.
//!
//! Requires Docker to be running for testcontainers; run with
//! `--ignored` or point `ETL_TEST_CLICKHOUSE_URL` at a live instance.

use clickhouse_client::health::{check_connection, init_schema};
use clickhouse_client::{AnalyticsRow, ClickHouseClient, ClickHouseSink};
use etl_core::{ColumnarSink, SinkBatch};
use integration_tests::containers::TestClickHouse;
use integration_tests::fixtures::{payload_for, view_event};
use integration_tests::mocks::MockSource;
use pipeline::{Pipeline, PipelineConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn row_count(client: &ClickHouseClient, table: &str) -> u64 {
    client
        .inner()
        .query(&format!("SELECT count() FROM {}", table))
        .fetch_one::<u64>()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_batch_insert_roundtrip() {
    let ch = TestClickHouse::start().await;
    let client = ch.client("analytics_roundtrip");
    assert!(check_connection(&client).await);
    init_schema(&client).await.unwrap();

    let events: Vec<_> = (0..3).map(|_| view_event()).collect();
    let sink = ClickHouseSink::new(client.clone());

    let mut batch = sink.prepare_batch(sink.default_target()).await.unwrap();
    for event in &events {
        batch.append(event).await.unwrap();
    }
    assert_eq!(batch.send().await.unwrap(), 3);

    let mut rows = client
        .inner()
        .query("SELECT ?fields FROM analytics_roundtrip ORDER BY user_id")
        .fetch_all::<AnalyticsRow>()
        .await
        .unwrap();
    rows.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    let mut expected: Vec<AnalyticsRow> = events.iter().map(AnalyticsRow::from).collect();
    expected.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    assert_eq!(rows, expected);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_abandoned_batch_writes_nothing() {
    let ch = TestClickHouse::start().await;
    let client = ch.client("analytics_abandoned");
    init_schema(&client).await.unwrap();

    let sink = ClickHouseSink::new(client.clone());
    let mut batch = sink.prepare_batch("analytics_abandoned").await.unwrap();
    batch.append(&view_event()).await.unwrap();
    drop(batch);

    assert_eq!(row_count(&client, "analytics_abandoned").await, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_missing_table_fails_batch() {
    let ch = TestClickHouse::start().await;
    let client = ch.client("analytics_missing");
    let sink = ClickHouseSink::new(client);

    let outcome = async {
        let mut batch = sink.prepare_batch("analytics_missing").await?;
        batch.append(&view_event()).await?;
        batch.send().await
    }
    .await;

    assert_eq!(outcome.unwrap_err().kind(), "sink");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_pipeline_loads_into_clickhouse() {
    let ch = TestClickHouse::start().await;
    let client = ch.client("analytics_pipeline");
    init_schema(&client).await.unwrap();

    let events: Vec<_> = (0..7).map(|_| view_event()).collect();
    let source = MockSource::closing(events.iter().map(payload_for).collect());
    let sink = ClickHouseSink::new(client.clone());
    let config =
        PipelineConfig::new(5, Duration::from_secs(300)).with_target(sink.default_target());

    let report = Pipeline::new(Arc::new(source.clone()), sink, config)
        .unwrap()
        .run(CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.committed, 7);
    assert_eq!(report.batches_flushed, 2);
    assert_eq!(source.committed(), (0..7).collect::<Vec<_>>());
    assert_eq!(row_count(&client, "analytics_pipeline").await, 7);
}
