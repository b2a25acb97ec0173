//! Loader stage: batches decoded events into the columnar sink.
//!
//! A batch is flushed when it reaches `batch_size` envelopes or when the
//! flush interval elapses, whichever comes first. Cancellation and upstream
//! shutdown both drain the buffer with one last flush. Every flush that
//! wrote something restarts the interval.

use crate::config::PipelineConfig;
use crate::envelope::Envelope;
use etl_core::{ColumnarSink, Error, Result, SinkBatch};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use telemetry::{health, metrics};
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Size,
    Interval,
    Cancelled,
    UpstreamClosed,
}

/// Committer hung up; nothing more can be forwarded.
struct Disconnected;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    pub batches_flushed: u64,
    pub batches_failed: u64,
    pub rows_loaded: u64,
}

/// Owns the sink and the batch buffer.
pub struct Loader<K: ColumnarSink, H> {
    sink: K,
    target: String,
    batch_size: usize,
    flush_interval: Duration,
    buffer: Vec<Envelope<H>>,
    out: Sender<Envelope<H>>,
    stats: LoaderStats,
}

impl<K: ColumnarSink, H: Send + Sync + 'static> Loader<K, H> {
    pub fn new(sink: K, config: &PipelineConfig, out: Sender<Envelope<H>>) -> Self {
        Self {
            sink,
            target: config.target.clone(),
            batch_size: config.batch_size,
            flush_interval: config.flush_interval(),
            buffer: Vec::with_capacity(config.batch_size),
            out,
            stats: LoaderStats::default(),
        }
    }

    /// Runs until cancelled or the transformer closes its side.
    pub async fn run(
        mut self,
        mut input: Receiver<Envelope<H>>,
        cancel: CancellationToken,
    ) -> LoaderStats {
        info!(
            target_table = %self.target,
            batch_size = self.batch_size,
            flush_interval_ms = %self.flush_interval.as_millis(),
            "Loader started"
        );

        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    let _ = self.flush(Trigger::Cancelled).await;
                    break;
                }

                _ = ticker.tick() => match self.flush(Trigger::Interval).await {
                    Ok(true) => ticker.reset(),
                    Ok(false) => {}
                    Err(Disconnected) => break,
                },

                next = input.recv() => match next {
                    Some(envelope) => {
                        if self.accept(envelope).await.is_err() {
                            break;
                        }
                        if self.buffer.len() >= self.batch_size {
                            match self.flush(Trigger::Size).await {
                                Ok(true) => ticker.reset(),
                                Ok(false) => {}
                                Err(Disconnected) => break,
                            }
                        }
                    }
                    None => {
                        let _ = self.flush(Trigger::UpstreamClosed).await;
                        break;
                    }
                },
            }
        }

        metrics().buffered_envelopes.set(0);
        info!(
            batches_flushed = self.stats.batches_flushed,
            batches_failed = self.stats.batches_failed,
            rows_loaded = self.stats.rows_loaded,
            "Loader stopped"
        );
        self.stats
    }

    /// Buffers a decoded envelope; anything else goes straight to the committer.
    ///
    /// A failed envelope therefore reaches the committer ahead of decoded
    /// envelopes that arrived before it and are still buffered. Output order
    /// is arrival order only among envelopes that pass through the buffer.
    /// Failed envelopes are never committed, so the reordering cannot move
    /// the committed offset.
    async fn accept(&mut self, mut envelope: Envelope<H>) -> std::result::Result<(), Disconnected> {
        if envelope.event().is_some() {
            self.buffer.push(envelope);
            metrics().buffered_envelopes.set(self.buffer.len() as u64);
            return Ok(());
        }

        if !envelope.is_failed() {
            envelope.fail(Arc::new(Error::internal("envelope reached loader undecoded")));
        }
        self.forward(envelope).await
    }

    async fn forward(&self, envelope: Envelope<H>) -> std::result::Result<(), Disconnected> {
        self.out.send(envelope).await.map_err(|_| Disconnected)
    }

    /// Writes the buffer as one batch and forwards every envelope.
    /// Returns whether there was anything to write.
    async fn flush(&mut self, trigger: Trigger) -> std::result::Result<bool, Disconnected> {
        if self.buffer.is_empty() {
            return Ok(false);
        }

        let count = self.buffer.len();
        match self.submit().await {
            Ok(rows) => {
                self.stats.batches_flushed += 1;
                self.stats.rows_loaded += rows as u64;
                metrics().batches_flushed.inc();
                metrics().rows_loaded.inc_by(rows as u64);
                health().clickhouse.set_healthy();
                debug!(trigger = ?trigger, rows = rows, "Batch flushed");
            }
            Err(e) => {
                self.stats.batches_failed += 1;
                metrics().batch_failures.inc();
                health().clickhouse.set_unhealthy(e.to_string());
                error!(
                    trigger = ?trigger,
                    envelopes = count,
                    error = %e,
                    "Batch flush failed"
                );

                let cause = Arc::new(e);
                for envelope in self.buffer.iter_mut() {
                    envelope.fail(cause.clone());
                }
            }
        }

        metrics().buffered_envelopes.set(0);
        for envelope in self.buffer.drain(..) {
            if self.out.send(envelope).await.is_err() {
                return Err(Disconnected);
            }
        }
        Ok(true)
    }

    /// Prepare, append, send. Any failure abandons the batch.
    async fn submit(&self) -> Result<usize> {
        let mut batch = self.sink.prepare_batch(&self.target).await?;
        for event in self.buffer.iter().filter_map(|e| e.event()) {
            batch.append(event).await?;
        }
        batch.send().await
    }
}
