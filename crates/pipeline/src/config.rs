//! Pipeline configuration.

use etl_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Batching configuration for the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Envelopes per batch; reaching it triggers a flush
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum time a partial batch may wait, in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Sink target (table) batches are written to. Not read from config
    /// files; the binary sets it from the sink's own table setting.
    #[serde(skip, default = "default_target")]
    pub target: String,
}

fn default_batch_size() -> usize {
    5
}

fn default_flush_interval_ms() -> u64 {
    300_000
}

fn default_target() -> String {
    "analytics".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            target: default_target(),
        }
    }
}

impl PipelineConfig {
    pub fn new(batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            batch_size,
            flush_interval_ms: flush_interval.as_millis() as u64,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.flush_interval_ms == 0 {
            return Err(Error::config("flush_interval_ms must be greater than 0"));
        }
        if self.target.is_empty() {
            return Err(Error::config("target must not be empty"));
        }
        Ok(())
    }
}
