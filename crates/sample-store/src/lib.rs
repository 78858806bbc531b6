//! Bounded Sample Store
//!
//! Provides the canonical drowsiness sample type and a drop-oldest bounded
//! buffer for retained history.

mod store;

pub use store::{SampleStore, DEFAULT_CAPACITY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped binary drowsiness observation.
///
/// `level` is a denormalized numeric view of `is_drowsy` (100 when drowsy,
/// 0 otherwise) kept for consumers that expect a numeric channel.
/// Samples are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub is_drowsy: bool,
    pub level: u8,
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Create a sample, deriving `level` from the drowsy flag.
    pub fn new(is_drowsy: bool, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_drowsy,
            level: if is_drowsy { 100 } else { 0 },
            timestamp,
        }
    }
}
