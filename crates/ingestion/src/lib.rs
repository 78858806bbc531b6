//! Ingestion Gateway
//!
//! Validates and timestamps incoming samples from real or simulated
//! producers, pushes them into the store and the transition tracker, then
//! hands off to the broadcaster. All producers go through this single choke
//! point; its internal lock serializes ingestion so transition detection
//! never interleaves.

mod gateway;

pub use gateway::{IngestCounters, IngestionGateway, RawSample};

use thiserror::Error;

/// Ingestion error types
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    /// Malformed ingestion body; surfaced to the producer as a 400.
    #[error("{0}")]
    InvalidSampleFormat(String),
}
