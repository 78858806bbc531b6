//! Broadcast Layer
//!
//! Maintains the set of live subscribers and pushes each ingested sample
//! (and, on subscribe, a recent-history snapshot) to all of them. Delivery
//! is best-effort per subscriber; a failed push removes that subscriber
//! without affecting the others.

mod broadcaster;

pub use broadcaster::{Broadcaster, ChannelSubscriber, SubscriberId};

use sample_store::Sample;
use serde::Serialize;
use thiserror::Error;

/// Per-subscriber push failure. Fully internal: it triggers removal of the
/// failing subscriber and is never surfaced to producers.
#[derive(Debug, Clone, Error)]
pub enum DeliveryFailure {
    #[error("subscriber channel closed")]
    ChannelClosed,
}

/// Message pushed to subscribers.
///
/// Serializes to the wire envelope `{"type": "history"|"data", "data": …}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum PushMessage {
    /// Recent-history snapshot sent once on subscribe
    History(Vec<Sample>),
    /// Single new sample
    Data(Sample),
}

/// A push-capable subscriber handle, one per transport (real-time channel,
/// test harness, etc.). `push` must not block; a slow consumer is the
/// transport's problem, not the broadcaster's.
pub trait Subscriber: Send + Sync {
    fn push(&self, message: &PushMessage) -> Result<(), DeliveryFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_message_envelope() {
        let sample = Sample::new(true, Utc.timestamp_opt(0, 0).unwrap());

        let data = serde_json::to_value(PushMessage::Data(sample.clone())).unwrap();
        assert_eq!(data["type"], "data");
        assert_eq!(data["data"]["isDrowsy"], true);

        let history = serde_json::to_value(PushMessage::History(vec![sample])).unwrap();
        assert_eq!(history["type"], "history");
        assert_eq!(history["data"].as_array().unwrap().len(), 1);
    }
}
