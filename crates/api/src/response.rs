//! Response bodies.

use serde::{Deserialize, Serialize};
use telemetry::{ComponentHealthReport, HealthReport, PipelineState};

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub pipeline: PipelineState,
    pub redpanda_connected: bool,
    pub clickhouse_connected: bool,
    pub buffered_envelopes: u64,
    pub components: Vec<ComponentHealthReport>,
    pub timestamp: i64,
}

impl HealthResponse {
    pub fn from_report(report: HealthReport, buffered_envelopes: u64) -> Self {
        let connected = |name: &str| {
            report
                .components
                .iter()
                .any(|c| c.name == name && c.healthy)
        };

        Self {
            status: report.status.as_str().to_string(),
            pipeline: report.pipeline,
            redpanda_connected: connected("redpanda"),
            clickhouse_connected: connected("clickhouse"),
            buffered_envelopes,
            timestamp: chrono::Utc::now().timestamp_millis(),
            components: report.components,
        }
    }
}

/// Probe response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub ok: bool,
    pub pipeline: PipelineState,
}
