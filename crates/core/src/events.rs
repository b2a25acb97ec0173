//! Analytics event model and wire decoding.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single "user watched movie" analytics fact.
///
/// Wire format is a flat JSON object:
/// `{"user_id": "...", "movie_id": "...", "timestamp_ms": 1700000000000}`.
/// Extra fields are ignored; missing or mistyped fields fail decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub user_id: String,
    pub movie_id: String,
    pub timestamp_ms: i64, // milliseconds since epoch
}

impl AnalyticsEvent {
    pub fn new(user_id: impl Into<String>, movie_id: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            user_id: user_id.into(),
            movie_id: movie_id.into(),
            timestamp_ms,
        }
    }

    /// Decodes an event from a raw message payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Encodes the event into its wire format.
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Event time as a UTC datetime, if the timestamp is representable.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }
}
