//! OTP Relay — one-time-code extraction and single-use delivery.
//!
//! Ingests inbound email deposited in object storage, extracts verification
//! codes through a tenant-aware pattern cascade, and serves each code at
//! most once through an atomic claim.

pub mod claim;
pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod store;
