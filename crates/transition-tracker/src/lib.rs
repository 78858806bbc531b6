//! Transition Tracker
//!
//! Consumes the sample stream in order, detects alert/drowsy transitions,
//! and accumulates total drowsy duration plus a bounded transition log.

mod tracker;

pub use tracker::{
    AggregateStats, TransitionEvent, TransitionKind, TransitionTracker, DEFAULT_EVENT_CAPACITY,
};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Tracker error types
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// Sample timestamp precedes the last processed sample. Accepting it
    /// would corrupt the drowsy-duration accounting, so it is rejected.
    #[error("out-of-order sample: {timestamp} is earlier than last update {last_update}")]
    OutOfOrderSample {
        timestamp: DateTime<Utc>,
        last_update: DateTime<Utc>,
    },
}
