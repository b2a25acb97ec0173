//! Wires the four stages together and supervises a run.

use crate::commit::{run_committer, CommitStats};
use crate::config::PipelineConfig;
use crate::extract::{run_extractor, Termination};
use crate::load::{Loader, LoaderStats};
use crate::transform::run_transformer;
use etl_core::{ColumnarSink, Error, QueueSource, Result};
use serde::Serialize;
use std::sync::Arc;
use telemetry::{health, PipelineState};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Capacity of the channels between stages. Each send waits for the next
/// stage to make room, so a slow sink stalls fetching.
const HANDOFF_CAPACITY: usize = 1;

/// Outcome of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub termination: Termination,
    pub transformed: u64,
    pub batches_flushed: u64,
    pub batches_failed: u64,
    pub rows_loaded: u64,
    pub committed: u64,
    pub dropped: u64,
    pub commit_failures: u64,
}

impl PipelineReport {
    fn new(termination: Termination, transformed: u64, load: LoaderStats, commit: CommitStats) -> Self {
        Self {
            termination,
            transformed,
            batches_flushed: load.batches_flushed,
            batches_failed: load.batches_failed,
            rows_loaded: load.rows_loaded,
            committed: commit.committed,
            dropped: commit.dropped,
            commit_failures: commit.commit_failures,
        }
    }
}

/// Extract, transform, load, commit.
pub struct Pipeline<S: QueueSource, K: ColumnarSink> {
    source: Arc<S>,
    sink: K,
    config: PipelineConfig,
}

impl<S: QueueSource, K: ColumnarSink> Pipeline<S, K> {
    pub fn new(source: Arc<S>, sink: K, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            sink,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs until `cancel` fires or the source stops, then drains.
    ///
    /// Envelopes still in flight when the loader stops are neither loaded
    /// nor committed; the source redelivers them.
    pub async fn run(self, cancel: CancellationToken) -> Result<PipelineReport> {
        let Pipeline {
            source,
            sink,
            config,
        } = self;

        info!(
            batch_size = config.batch_size,
            flush_interval_ms = config.flush_interval_ms,
            target_table = %config.target,
            "Pipeline starting"
        );

        let (fetched_tx, fetched_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (decoded_tx, decoded_rx) = mpsc::channel(HANDOFF_CAPACITY);
        let (loaded_tx, loaded_rx) = mpsc::channel(HANDOFF_CAPACITY);

        let extractor = tokio::spawn(run_extractor(source.clone(), fetched_tx, cancel.clone()));
        let transformer = tokio::spawn(run_transformer(fetched_rx, decoded_tx));
        let loader = tokio::spawn(Loader::new(sink, &config, loaded_tx).run(decoded_rx, cancel.clone()));
        let committer = tokio::spawn(run_committer(source, loaded_rx));

        health().set_pipeline_state(PipelineState::Running);

        let termination = extractor.await;
        health().set_pipeline_state(PipelineState::Draining);
        info!("Pipeline draining");

        // Every stage is awaited even if an earlier one panicked; the rest
        // shut down as their channels close.
        let transformed = transformer.await;
        let load = loader.await;
        let commit = committer.await;

        let report = match (termination, transformed, load, commit) {
            (Ok(termination), Ok(transformed), Ok(load), Ok(commit)) => {
                PipelineReport::new(termination, transformed, load, commit)
            }
            (termination, transformed, load, commit) => {
                health().set_pipeline_state(PipelineState::Failed);
                let err = [
                    termination.err().map(|e| stage_failure("extractor", e)),
                    transformed.err().map(|e| stage_failure("transformer", e)),
                    load.err().map(|e| stage_failure("loader", e)),
                    commit.err().map(|e| stage_failure("committer", e)),
                ]
                .into_iter()
                .flatten()
                .next()
                .unwrap_or_else(|| Error::internal("pipeline stage failed"));
                return Err(err);
            }
        };

        let final_state = if report.termination.is_failure() {
            PipelineState::Failed
        } else {
            PipelineState::Stopped
        };
        health().set_pipeline_state(final_state);

        info!(
            termination = ?report.termination,
            committed = report.committed,
            dropped = report.dropped,
            commit_failures = report.commit_failures,
            rows_loaded = report.rows_loaded,
            "Pipeline stopped"
        );

        Ok(report)
    }
}

fn stage_failure(stage: &str, e: JoinError) -> Error {
    error!(stage = stage, error = %e, "Pipeline stage did not finish");
    Error::internal(format!("{} stage failed: {}", stage, e))
}
