//! Unified error types for the ETL pipeline.
//!
//! Errors fall into four families that the pipeline treats differently:
//! - Source: fetching from the queue failed, terminal for the extractor
//! - Decode: one payload could not be parsed, the envelope is dropped
//! - Sink: a batch insert failed, every envelope in the batch is dropped
//! - Commit: acknowledging one message failed, logged only

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the ETL pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("source error: {0}")]
    Source(String),

    #[error("source closed")]
    SourceClosed,

    #[error("sink error: {0}")]
    Sink(String),

    #[error("commit error: {0}")]
    Commit(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    pub fn commit(msg: impl Into<String>) -> Self {
        Self::Commit(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::Source(_) => "source",
            Self::SourceClosed => "source_closed",
            Self::Sink(_) => "sink",
            Self::Commit(_) => "commit",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}
