//! In-process pipeline metrics.
//!
//! Counters are process-wide and lock-free; a snapshot is exposed over the
//! status endpoint and logged on shutdown.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Point-in-time value.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency histogram in milliseconds.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 5ms, 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
    max: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [5, 10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
            max: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    /// Returns `(upper_bound_ms, count)` pairs.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the ETL pipeline.
#[derive(Debug, Default)]
pub struct Metrics {
    // Extract
    pub messages_fetched: Counter,
    pub fetch_errors: Counter,

    // Transform
    pub decode_errors: Counter,

    // Load
    pub batches_flushed: Counter,
    pub batch_failures: Counter,
    pub rows_loaded: Counter,
    pub flush_latency_ms: Histogram,
    pub buffered_envelopes: Gauge,

    // Commit
    pub envelopes_committed: Counter,
    pub envelopes_dropped: Counter,
    pub commit_errors: Counter,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            messages_fetched: self.messages_fetched.get(),
            fetch_errors: self.fetch_errors.get(),
            decode_errors: self.decode_errors.get(),
            batches_flushed: self.batches_flushed.get(),
            batch_failures: self.batch_failures.get(),
            rows_loaded: self.rows_loaded.get(),
            flush_latency_mean_ms: self.flush_latency_ms.mean(),
            flush_latency_max_ms: self.flush_latency_ms.max(),
            buffered_envelopes: self.buffered_envelopes.get(),
            envelopes_committed: self.envelopes_committed.get(),
            envelopes_dropped: self.envelopes_dropped.get(),
            commit_errors: self.commit_errors.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub messages_fetched: u64,
    pub fetch_errors: u64,
    pub decode_errors: u64,
    pub batches_flushed: u64,
    pub batch_failures: u64,
    pub rows_loaded: u64,
    pub flush_latency_mean_ms: f64,
    pub flush_latency_max_ms: u64,
    pub buffered_envelopes: u64,
    pub envelopes_committed: u64,
    pub envelopes_dropped: u64,
    pub commit_errors: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
