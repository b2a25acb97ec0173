//! Queue source abstraction.

use async_trait::async_trait;

use crate::error::Result;

/// A raw message pulled from the queue.
///
/// The payload is opaque bytes; the handle is only meaningful to the source
/// that produced it and is handed back on commit.
#[derive(Debug, Clone)]
pub struct QueueMessage<H> {
    pub payload: Vec<u8>,
    pub handle: H,
}

impl<H> QueueMessage<H> {
    pub fn new(payload: impl Into<Vec<u8>>, handle: H) -> Self {
        Self {
            payload: payload.into(),
            handle,
        }
    }
}

/// Pull-based message source with explicit acknowledgement.
///
/// `fetch` blocks until a message is available. It returns
/// [`Error::SourceClosed`](crate::Error::SourceClosed) once the source is
/// exhausted and any other error when it can no longer deliver. Retries and
/// reconnect backoff are the implementation's concern.
///
/// Messages that are never committed are redelivered when the consumer
/// restarts (at-least-once).
#[async_trait]
pub trait QueueSource: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Fetches the next message.
    async fn fetch(&self) -> Result<QueueMessage<Self::Handle>>;

    /// Acknowledges a message as durably processed.
    async fn commit(&self, handle: &Self::Handle) -> Result<()>;
}
