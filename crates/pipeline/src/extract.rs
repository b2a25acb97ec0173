//! Extractor stage: pulls messages from the queue source.

use crate::envelope::Envelope;
use etl_core::{Error, QueueSource};
use serde::Serialize;
use std::sync::Arc;
use telemetry::health;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Why the extractor stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "error", rename_all = "snake_case")]
pub enum Termination {
    /// The run was cancelled, or everything downstream has shut down
    Cancelled,
    /// The source reported that it has no more messages
    SourceClosed,
    /// The source could no longer deliver
    SourceFailed(String),
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SourceFailed(_))
    }
}

/// Fetches until cancelled or the source stops, one envelope per message.
///
/// Dropping `out` on return is what tells the rest of the pipeline to drain.
pub async fn run_extractor<S: QueueSource>(
    source: Arc<S>,
    out: Sender<Envelope<S::Handle>>,
    cancel: CancellationToken,
) -> Termination {
    info!("Extractor started");
    let mut fetched: u64 = 0;

    let termination = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break Termination::Cancelled,
            next = source.fetch() => next,
        };

        match next {
            Ok(message) => {
                fetched += 1;
                if out.send(Envelope::new(message)).await.is_err() {
                    debug!("Transformer gone, extractor stopping");
                    break Termination::Cancelled;
                }
            }
            Err(Error::SourceClosed) => break Termination::SourceClosed,
            Err(e) => {
                error!(error = %e, kind = e.kind(), "Fetch failed, extractor stopping");
                health().redpanda.set_unhealthy(e.to_string());
                break Termination::SourceFailed(e.to_string());
            }
        }
    };

    info!(fetched = fetched, termination = ?termination, "Extractor stopped");
    termination
}
