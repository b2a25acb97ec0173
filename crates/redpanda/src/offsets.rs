//! Durable committed offsets.
//!
//! rskafka has no consumer-group offset API, so the source keeps its own
//! group offsets. Each entry is keyed by group id, topic and partition and
//! holds the next offset to read.

use crate::config::RedpandaConfig;
use etl_core::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identifies one group's position on one partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetKey {
    pub group_id: String,
    pub topic: String,
    pub partition: i32,
}

impl OffsetKey {
    pub fn new(group_id: impl Into<String>, topic: impl Into<String>, partition: i32) -> Self {
        Self {
            group_id: group_id.into(),
            topic: topic.into(),
            partition,
        }
    }

    pub fn for_config(config: &RedpandaConfig) -> Self {
        Self::new(&config.group_id, &config.topic, config.partition)
    }
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group_id, self.topic, self.partition)
    }
}

/// Storage for committed offsets that survives a restart.
pub trait OffsetStore: Send + Sync + 'static {
    /// The stored next offset, if this key has ever been committed.
    fn load(&self, key: &OffsetKey) -> Result<Option<i64>>;

    /// Persists `offset` as the next offset to read for `key`.
    fn save(&self, key: &OffsetKey, offset: i64) -> Result<()>;
}

/// Offsets kept in a JSON file, one entry per key.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct FileOffsetStore {
    path: PathBuf,
    lock: parking_lot::Mutex<()>,
}

impl FileOffsetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: parking_lot::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, i64>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::source(format!(
                    "Corrupt offset store {}: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::source(format!(
                "Failed to read offset store {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn write_all(&self, offsets: &BTreeMap<String, i64>) -> Result<()> {
        let io_err = |e: std::io::Error| {
            Error::commit(format!(
                "Failed to write offset store {}: {}",
                self.path.display(),
                e
            ))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let bytes = serde_json::to_vec_pretty(offsets)
            .map_err(|e| Error::commit(format!("Failed to encode offsets: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl OffsetStore for FileOffsetStore {
    fn load(&self, key: &OffsetKey) -> Result<Option<i64>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.get(&key.to_string()).copied())
    }

    fn save(&self, key: &OffsetKey, offset: i64) -> Result<()> {
        let _guard = self.lock.lock();
        let mut offsets = self.read_all()?;
        offsets.insert(key.to_string(), offset);
        self.write_all(&offsets)?;

        debug!(key = %key, offset = offset, path = %self.path.display(), "Stored offset");
        Ok(())
    }
}
