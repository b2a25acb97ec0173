//! Tests for the status endpoints.
//!
//! Health state is process-wide, so transitions are exercised in a single
//! test to keep them ordered.

use api::response::{HealthResponse, ProbeResponse};
use api::router;
use axum::http::StatusCode;
use axum_test::TestServer;
use telemetry::{health, metrics, PipelineState};

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let server = TestServer::new(router()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    for field in [
        "status",
        "pipeline",
        "redpanda_connected",
        "clickhouse_connected",
        "buffered_envelopes",
        "components",
    ] {
        assert!(body.get(field).is_some(), "Response should have '{}' field", field);
    }

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        ["healthy", "degraded", "unhealthy"].contains(&status),
        "unexpected status '{}'",
        status
    );
}

#[tokio::test]
async fn test_probes_follow_pipeline_lifecycle() {
    let server = TestServer::new(router()).expect("Failed to create test server");

    health().redpanda.set_healthy();
    health().clickhouse.set_healthy();
    health().set_pipeline_state(PipelineState::Running);

    server.get("/health/ready").await.assert_status_ok();
    let body: HealthResponse = server.get("/health").await.json();
    assert_eq!(body.status, "healthy");
    assert_eq!(body.pipeline, PipelineState::Running);
    assert!(body.redpanda_connected && body.clickhouse_connected);

    health().clickhouse.set_unhealthy("insert timeout");
    let response = server.get("/health/ready").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: HealthResponse = server.get("/health").await.json();
    assert_eq!(body.status, "degraded");
    assert!(!body.clickhouse_connected);

    health().set_pipeline_state(PipelineState::Failed);
    let response = server.get("/health/live").await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let probe: ProbeResponse = response.json();
    assert!(!probe.ok);
    assert_eq!(probe.pipeline, PipelineState::Failed);
}

#[tokio::test]
async fn test_metrics_snapshot() {
    let server = TestServer::new(router()).expect("Failed to create test server");
    metrics().rows_loaded.inc_by(5);

    let response = server.get("/metrics").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body["rows_loaded"].as_u64().unwrap() >= 5);
    assert!(body.get("flush_latency_mean_ms").is_some());
}
