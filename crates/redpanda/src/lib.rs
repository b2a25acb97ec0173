//! Redpanda queue source for the UGC analytics ETL.

pub mod config;
pub mod consumer;
pub mod health;
pub mod offsets;

pub use config::*;
pub use consumer::*;
pub use offsets::{FileOffsetStore, OffsetKey, OffsetStore};
