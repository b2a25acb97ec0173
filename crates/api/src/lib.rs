//! Status endpoints for the UGC analytics ETL.
//!
//! The pipeline has no functional HTTP surface; this crate only exposes
//! health probes and a metrics snapshot for operators.

pub mod config;
pub mod response;
pub mod routes;
pub mod server;

pub use config::StatusConfig;
pub use routes::router;
pub use server::serve;
