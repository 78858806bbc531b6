//! Route handlers

pub mod history;
pub mod ingest;
pub mod simulation;
pub mod stats;
