//! Redpanda queue source.
//!
//! Uses rskafka for Kafka-compatible consumption with:
//! - One partition client per source, created lazily and cached
//! - Chunked fetches handed out one record at a time
//! - Group offsets persisted through an [`OffsetStore`] for at-least-once delivery

use crate::config::{RedpandaConfig, StartOffset};
use crate::offsets::{FileOffsetStore, OffsetKey, OffsetStore};
use async_trait::async_trait;
use etl_core::{Error, QueueMessage, QueueSource, Result};
use rskafka::client::{
    partition::{OffsetAt, PartitionClient, UnknownTopicHandling},
    ClientBuilder, Credentials, SaslConfig,
};
use rskafka::record::RecordAndOffset;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Creates a TLS configuration for Redpanda Cloud.
fn create_tls_config() -> Arc<rustls::ClientConfig> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

/// Client builder with TLS and SASL applied when credentials are configured.
pub(crate) fn client_builder(config: &RedpandaConfig) -> ClientBuilder {
    let builder = ClientBuilder::new(config.brokers.clone());

    match config.credentials() {
        Some((username, password)) => builder
            .tls_config(create_tls_config())
            .sasl_config(SaslConfig::ScramSha256(Credentials::new(
                username.to_string(),
                password.to_string(),
            ))),
        None => builder,
    }
}

/// Commit handle for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Default)]
struct FetchState {
    /// Next offset to request; unset until the start position is resolved
    next_offset: Option<i64>,
    /// Records fetched but not yet handed out
    pending: VecDeque<RecordAndOffset>,
}

/// Pull-based source over a single Redpanda partition.
pub struct RedpandaSource {
    config: RedpandaConfig,
    partition_client: RwLock<Option<Arc<PartitionClient>>>,
    state: Mutex<FetchState>,
    store: Arc<dyn OffsetStore>,
    key: OffsetKey,
    /// Next offset a restarted consumer should resume from, -1 before any commit
    committed: AtomicI64,
    /// Serializes store writes so a stale commit never lands after a newer one
    commit_lock: Mutex<()>,
}

impl RedpandaSource {
    /// Creates a new source backed by the file at `offset_store_path`.
    /// The broker connection is opened on first fetch.
    pub fn new(config: RedpandaConfig) -> Result<Self> {
        let store = FileOffsetStore::new(&config.offset_store_path);
        Self::with_store(config, Arc::new(store))
    }

    /// Creates a new source that keeps its group offset in `store`.
    pub fn with_store(config: RedpandaConfig, store: Arc<dyn OffsetStore>) -> Result<Self> {
        let key = OffsetKey::for_config(&config);
        let stored = store.load(&key)?;

        info!(
            topic = %config.topic,
            partition = config.partition,
            group_id = %config.group_id,
            start_offset = ?config.start_offset,
            stored_offset = ?stored,
            "Creating Redpanda source"
        );

        Ok(Self {
            config,
            partition_client: RwLock::new(None),
            state: Mutex::new(FetchState::default()),
            store,
            key,
            committed: AtomicI64::new(stored.unwrap_or(-1)),
            commit_lock: Mutex::new(()),
        })
    }

    /// Returns the partition client, connecting if needed.
    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        {
            let client = self.partition_client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let client = client_builder(&self.config)
            .build()
            .await
            .map_err(|e| Error::source(format!("Failed to connect to Redpanda: {}", e)))?;

        let partition_client = client
            .partition_client(
                self.config.topic.clone(),
                self.config.partition,
                UnknownTopicHandling::Error,
            )
            .await
            .map_err(|e| Error::source(format!("Failed to get partition client: {}", e)))?;

        let partition_client = Arc::new(partition_client);
        *self.partition_client.write().await = Some(partition_client.clone());

        info!(
            topic = %self.config.topic,
            partition = self.config.partition,
            "Connected to Redpanda"
        );

        Ok(partition_client)
    }

    /// Drops the cached connection so the next fetch reconnects.
    pub async fn reset_connection(&self) {
        *self.partition_client.write().await = None;
        info!("Redpanda connection reset");
    }

    async fn resolve_start(&self, client: &PartitionClient) -> Result<i64> {
        if let Some(stored) = self.committed_offset() {
            let earliest = client
                .get_offset(OffsetAt::Earliest)
                .await
                .map_err(|e| Error::source(format!("Failed to get offset: {}", e)))?;

            // Retention may have removed records past the stored position
            if stored < earliest {
                warn!(
                    group_id = %self.config.group_id,
                    stored_offset = stored,
                    earliest_offset = earliest,
                    "Stored offset is no longer retained, resuming from earliest"
                );
                return Ok(earliest);
            }

            info!(
                topic = %self.config.topic,
                partition = self.config.partition,
                group_id = %self.config.group_id,
                offset = stored,
                "Source resumed from stored offset"
            );
            return Ok(stored);
        }

        let at = match self.config.start_offset {
            StartOffset::Earliest => OffsetAt::Earliest,
            StartOffset::Latest => OffsetAt::Latest,
        };

        let offset = client
            .get_offset(at)
            .await
            .map_err(|e| Error::source(format!("Failed to get offset: {}", e)))?;

        info!(
            topic = %self.config.topic,
            partition = self.config.partition,
            offset = offset,
            "Source positioned"
        );

        Ok(offset)
    }

    /// Fetches the next chunk of records into `state.pending`.
    async fn fill(&self, state: &mut FetchState) -> Result<()> {
        let client = self.ensure_connected().await?;

        let next = match state.next_offset {
            Some(offset) => offset,
            None => {
                let offset = self.resolve_start(&client).await?;
                state.next_offset = Some(offset);
                offset
            }
        };

        let (records, high_watermark) = client
            .fetch_records(next, 1..self.config.fetch_max_bytes, self.config.fetch_max_wait_ms)
            .await
            .map_err(|e| Error::source(format!("Failed to fetch records: {}", e)))?;

        // Compressed batches may start before the requested offset
        for record in records.into_iter().filter(|r| r.offset >= next) {
            state.next_offset = Some(record.offset + 1);
            state.pending.push_back(record);
        }

        if !state.pending.is_empty() {
            debug!(
                records = state.pending.len(),
                offset_start = next,
                high_watermark = high_watermark,
                "Fetched records from Redpanda"
            );
        }

        Ok(())
    }

    /// Returns the offset a restarted consumer should resume from.
    pub fn committed_offset(&self) -> Option<i64> {
        match self.committed.load(Ordering::SeqCst) {
            -1 => None,
            offset => Some(offset),
        }
    }

    /// Returns the source configuration.
    pub fn config(&self) -> &RedpandaConfig {
        &self.config
    }
}

#[async_trait]
impl QueueSource for RedpandaSource {
    type Handle = Offset;

    async fn fetch(&self) -> Result<QueueMessage<Offset>> {
        let mut state = self.state.lock().await;
        let mut failures = 0;

        loop {
            if let Some(record) = state.pending.pop_front() {
                metrics().messages_fetched.inc();
                let handle = Offset {
                    partition: self.config.partition,
                    offset: record.offset,
                };
                return Ok(QueueMessage::new(
                    record.record.value.unwrap_or_default(),
                    handle,
                ));
            }

            // An empty chunk means the long-poll expired; ask again
            if let Err(e) = self.fill(&mut state).await {
                metrics().fetch_errors.inc();
                failures += 1;
                if failures > self.config.retries {
                    return Err(e);
                }

                let backoff = Duration::from_millis(self.config.retry_backoff_ms) * failures;
                warn!(
                    attempt = failures,
                    backoff_ms = %backoff.as_millis(),
                    error = %e,
                    "Redpanda fetch failed, retrying"
                );
                self.reset_connection().await;
                tokio::time::sleep(backoff).await;
            }
        }
    }

    async fn commit(&self, handle: &Offset) -> Result<()> {
        if handle.partition != self.config.partition {
            return Err(Error::commit(format!(
                "offset belongs to partition {}, source reads partition {}",
                handle.partition, self.config.partition
            )));
        }

        let next = handle.offset + 1;
        let _guard = self.commit_lock.lock().await;

        // An older offset never moves the watermark back
        let prev = self.committed.load(Ordering::SeqCst);
        if next <= prev {
            return Ok(());
        }

        let store = self.store.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || store.save(&key, next))
            .await
            .map_err(|e| Error::commit(format!("Offset store task failed: {}", e)))??;

        self.committed.store(next, Ordering::SeqCst);

        debug!(
            key = %self.key,
            prev_offset = prev,
            new_offset = next,
            "Committed offset"
        );

        Ok(())
    }
}
