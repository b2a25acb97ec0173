//! Health check endpoints.

use axum::{http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::{HealthResponse, ProbeResponse};

/// GET /health - Full health check.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::from_report(
        health().report(),
        metrics().buffered_envelopes.get(),
    ))
}

/// GET /health/ready - Readiness probe (pipeline running, both ends reachable).
pub async fn ready_handler() -> (StatusCode, Json<ProbeResponse>) {
    probe(health().is_ready())
}

/// GET /health/live - Liveness probe (pipeline has not failed).
pub async fn live_handler() -> (StatusCode, Json<ProbeResponse>) {
    probe(health().is_alive())
}

fn probe(ok: bool) -> (StatusCode, Json<ProbeResponse>) {
    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ProbeResponse {
            ok,
            pipeline: health().pipeline_state(),
        }),
    )
}
