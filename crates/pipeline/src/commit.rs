//! Committer stage: acknowledges successfully loaded envelopes.

use crate::envelope::{Envelope, EnvelopeState};
use etl_core::QueueSource;
use serde::Serialize;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub committed: u64,
    pub dropped: u64,
    pub commit_failures: u64,
}

/// Commits in arrival order until the loader closes its side.
///
/// Failed envelopes are logged and dropped without a commit, so the source
/// redelivers them after a restart.
pub async fn run_committer<S: QueueSource>(
    source: Arc<S>,
    mut input: Receiver<Envelope<S::Handle>>,
) -> CommitStats {
    info!("Committer started");
    let mut stats = CommitStats::default();

    while let Some(envelope) = input.recv().await {
        match envelope.state() {
            EnvelopeState::Decoded(event) => match source.commit(envelope.handle()).await {
                Ok(()) => {
                    stats.committed += 1;
                    metrics().envelopes_committed.inc();
                    debug!(
                        user_id = %event.user_id,
                        movie_id = %event.movie_id,
                        occurred_at = ?event.occurred_at(),
                        "Committed"
                    );
                }
                Err(e) => {
                    stats.commit_failures += 1;
                    metrics().commit_errors.inc();
                    warn!(error = %e, "Commit failed");
                }
            },
            EnvelopeState::Failed(cause) => {
                stats.dropped += 1;
                metrics().envelopes_dropped.inc();
                error!(
                    error = %cause,
                    kind = cause.kind(),
                    bytes = envelope.payload().len(),
                    "Dropping envelope without commit"
                );
            }
            EnvelopeState::Fetched => {
                stats.dropped += 1;
                metrics().envelopes_dropped.inc();
                error!("Dropping undecoded envelope without commit");
            }
        }
    }

    info!(
        committed = stats.committed,
        dropped = stats.dropped,
        commit_failures = stats.commit_failures,
        "Committer stopped"
    );
    stats
}
