//! Simulation Driver
//!
//! Synthesizes drowsiness samples on a timer, flipping the simulated state
//! with a configurable probability each tick, and routes them through the
//! ingestion gateway exactly as a real detector would.

mod driver;

pub use driver::{SimulationConfig, SimulationDriver, SimulationStatus};

use thiserror::Error;

/// Simulation control errors; surfaced to the caller as state conflicts.
#[derive(Debug, Clone, Error)]
pub enum SimulationError {
    #[error("Simulation already running")]
    AlreadyRunning,
    #[error("No simulation running")]
    NotRunning,
}
