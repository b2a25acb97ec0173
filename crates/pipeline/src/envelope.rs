//! The unit of work that travels through every stage.

use etl_core::{AnalyticsEvent, Error, QueueMessage};
use std::sync::Arc;

/// Processing state of an envelope.
///
/// A failure cause is shared, so every envelope of a failed batch points at
/// the same error.
#[derive(Debug, Clone)]
pub enum EnvelopeState {
    Fetched,
    Decoded(AnalyticsEvent),
    Failed(Arc<Error>),
}

/// One fetched message plus what the pipeline has learned about it.
#[derive(Debug)]
pub struct Envelope<H> {
    payload: Vec<u8>,
    handle: H,
    state: EnvelopeState,
}

impl<H> Envelope<H> {
    /// Wraps a freshly fetched message.
    pub fn new(message: QueueMessage<H>) -> Self {
        Self {
            payload: message.payload,
            handle: message.handle,
            state: EnvelopeState::Fetched,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Source handle used to acknowledge this message.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn state(&self) -> &EnvelopeState {
        &self.state
    }

    /// The decoded event, if decoding succeeded and nothing failed since.
    pub fn event(&self) -> Option<&AnalyticsEvent> {
        match &self.state {
            EnvelopeState::Decoded(event) => Some(event),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<Error>> {
        match &self.state {
            EnvelopeState::Failed(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, EnvelopeState::Failed(_))
    }

    pub(crate) fn set_decoded(&mut self, event: AnalyticsEvent) {
        self.state = EnvelopeState::Decoded(event);
    }

    pub(crate) fn fail(&mut self, cause: Arc<Error>) {
        self.state = EnvelopeState::Failed(cause);
    }
}
