//! Columnar sink abstraction.

use async_trait::async_trait;

use crate::error::Result;
use crate::events::AnalyticsEvent;

/// Batch-insert capable analytics store.
#[async_trait]
pub trait ColumnarSink: Send + Sync + 'static {
    type Batch: SinkBatch;

    /// Opens a new write batch against `target`.
    async fn prepare_batch(&self, target: &str) -> Result<Self::Batch>;
}

/// An open write batch.
///
/// `send` is atomic: either every appended row lands or none do. Dropping a
/// batch without sending it discards the appended rows.
#[async_trait]
pub trait SinkBatch: Send + Sized {
    /// Appends one event as a row.
    async fn append(&mut self, event: &AnalyticsEvent) -> Result<()>;

    /// Submits the batch, returning the number of rows written.
    async fn send(self) -> Result<usize>;
}
