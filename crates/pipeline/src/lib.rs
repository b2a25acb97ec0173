//! Staged ETL pipeline: extract from a queue, decode, batch into a columnar
//! store, commit what was stored.
//!
//! Each stage runs in its own task and hands envelopes to the next one over
//! a bounded channel. Shutdown flows downstream: when a stage returns it drops
//! its sender, and the next stage drains and stops.

pub mod commit;
pub mod config;
pub mod envelope;
pub mod extract;
pub mod load;
pub mod runner;
pub mod transform;


pub use commit::CommitStats;
pub use config::PipelineConfig;
pub use envelope::{Envelope, EnvelopeState};
pub use extract::Termination;
pub use load::{Loader, LoaderStats};
pub use runner::{Pipeline, PipelineReport};
pub use transform::transform;
