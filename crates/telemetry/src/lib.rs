//! Telemetry for the UGC analytics ETL.
//!
//! Structured logging via `tracing`, plus process-wide metric and health
//! registries that the status endpoints read from.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
