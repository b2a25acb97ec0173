//! Redpanda consumer configuration.

use serde::{Deserialize, Serialize};

/// Where to begin reading when no offset has been committed in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    Earliest,
    Latest,
}

/// Redpanda source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    pub brokers: Vec<String>,
    /// Topic carrying analytics events
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Partition to consume
    #[serde(default)]
    pub partition: i32,
    /// Consumer group id; with topic and partition it keys the stored offset
    #[serde(default = "default_group_id")]
    pub group_id: String,
    /// SASL username (for cloud authentication)
    #[serde(default)]
    pub sasl_username: Option<String>,
    /// SASL password (for cloud authentication)
    #[serde(default)]
    pub sasl_password: Option<String>,
    /// Start position when the group has no stored offset
    #[serde(default = "default_start_offset")]
    pub start_offset: StartOffset,
    /// Upper bound on bytes returned by one fetch request
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: i32,
    /// How long the broker may hold a fetch open waiting for records
    #[serde(default = "default_fetch_max_wait_ms")]
    pub fetch_max_wait_ms: i32,
    /// Consecutive fetch failures tolerated before the source gives up
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Retry backoff in milliseconds, multiplied by the attempt number
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// File holding committed group offsets
    #[serde(default = "default_offset_store_path")]
    pub offset_store_path: String,
}

fn default_topic() -> String {
    "analytics".to_string()
}

fn default_group_id() -> String {
    "ugc-etl".to_string()
}

fn default_start_offset() -> StartOffset {
    StartOffset::Latest
}

fn default_fetch_max_bytes() -> i32 {
    1024 * 1024
}

fn default_fetch_max_wait_ms() -> i32 {
    500
}

fn default_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_offset_store_path() -> String {
    "data/offsets.json".to_string()
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: default_topic(),
            partition: 0,
            group_id: default_group_id(),
            sasl_username: None,
            sasl_password: None,
            start_offset: default_start_offset(),
            fetch_max_bytes: default_fetch_max_bytes(),
            fetch_max_wait_ms: default_fetch_max_wait_ms(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            offset_store_path: default_offset_store_path(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    /// SASL credentials, when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}
