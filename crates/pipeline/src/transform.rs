//! Transformer stage: decodes payloads into events.

use crate::envelope::{Envelope, EnvelopeState};
use etl_core::AnalyticsEvent;
use std::sync::Arc;
use telemetry::metrics;
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, info, warn};

/// Decodes a fetched envelope. Failed envelopes pass through untouched.
pub fn transform<H>(mut envelope: Envelope<H>) -> Envelope<H> {
    if matches!(envelope.state(), EnvelopeState::Fetched) {
        match AnalyticsEvent::decode(envelope.payload()) {
            Ok(event) => envelope.set_decoded(event),
            Err(e) => {
                metrics().decode_errors.inc();
                warn!(error = %e, bytes = envelope.payload().len(), "Malformed payload");
                envelope.fail(Arc::new(e));
            }
        }
    }
    envelope
}

/// Runs until the extractor closes its side; returns the envelope count.
pub async fn run_transformer<H>(
    mut input: Receiver<Envelope<H>>,
    out: Sender<Envelope<H>>,
) -> u64 {
    info!("Transformer started");
    let mut transformed: u64 = 0;

    while let Some(envelope) = input.recv().await {
        if out.send(transform(envelope)).await.is_err() {
            debug!("Loader gone, transformer stopping");
            break;
        }
        transformed += 1;
    }

    info!(transformed = transformed, "Transformer stopped");
    transformed
}
