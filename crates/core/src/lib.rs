//! Core types and external interfaces for the UGC analytics ETL.

pub mod error;
pub mod events;
pub mod sink;
pub mod source;

pub use error::{Error, Result};
pub use events::*;
pub use sink::*;
pub use source::*;
