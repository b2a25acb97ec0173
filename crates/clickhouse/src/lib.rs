//! ClickHouse columnar sink for the UGC analytics ETL.

pub mod client;
pub mod config;
pub mod health;
pub mod insert;
pub mod schema;

pub use client::*;
pub use config::*;
pub use insert::{AnalyticsRow, ClickHouseBatch, ClickHouseSink};
