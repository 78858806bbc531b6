//! Gateway implementation

use crate::IngestError;
use broadcast::{Broadcaster, Subscriber, SubscriberId};
use chrono::{DateTime, Utc};
use sample_store::{Sample, SampleStore};
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use transition_tracker::{AggregateStats, TransitionEvent, TransitionTracker};
use tracing::{info, warn};

/// Raw ingestion body as received from a producer, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSample {
    #[serde(default)]
    pub is_drowsy: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// All-time ingestion counters, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestCounters {
    /// Samples ever accepted
    pub total_written: u64,
    /// Drowsy samples ever accepted
    pub total_drowsy: u64,
    /// Samples dropped for non-monotonic timestamps
    pub dropped: u64,
    /// Samples currently retained in the store
    pub retained: usize,
}

/// The single write path into the monitoring pipeline.
///
/// Owns the store and tracker jointly; nothing else writes to them. The
/// internal mutex serializes `ingest` calls so the DrowsyStart/DrowsyEnd
/// pairing invariant holds under concurrent producers.
pub struct IngestionGateway {
    pipeline: Mutex<Pipeline>,
    broadcaster: Arc<Broadcaster>,
}

struct Pipeline {
    store: SampleStore,
    tracker: TransitionTracker,
    dropped: u64,
}

impl IngestionGateway {
    /// Create a gateway with default store and event-log capacities.
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self::with_store(SampleStore::with_default_capacity(), broadcaster)
    }

    /// Create a gateway around a pre-sized store.
    pub fn with_store(store: SampleStore, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            pipeline: Mutex::new(Pipeline {
                store,
                tracker: TransitionTracker::new(),
                dropped: 0,
            }),
            broadcaster,
        }
    }

    /// Validate and ingest a raw producer body.
    ///
    /// Returns the canonical sample on success, `Ok(None)` when the sample
    /// was dropped for a non-monotonic timestamp (logged, never surfaced to
    /// the producer), or `InvalidSampleFormat` for a malformed body.
    pub fn ingest(&self, raw: RawSample) -> Result<Option<Sample>, IngestError> {
        let is_drowsy = coerce_drowsy(raw.is_drowsy.as_ref())?;
        let timestamp = match raw.timestamp.as_deref() {
            Some(text) => parse_timestamp(text)?,
            None => Utc::now(),
        };

        info!(
            state = if is_drowsy { "DROWSY" } else { "ALERT" },
            "received drowsiness state"
        );
        Ok(self.ingest_sample(Sample::new(is_drowsy, timestamp)))
    }

    /// Strictly typed ingestion path for the manual override and the
    /// simulation producer; the sample is stamped with ingestion time.
    pub fn ingest_state(&self, is_drowsy: bool) -> Option<Sample> {
        self.ingest_sample(Sample::new(is_drowsy, Utc::now()))
    }

    fn ingest_sample(&self, sample: Sample) -> Option<Sample> {
        let mut pipeline = self.lock();

        if let Err(e) = pipeline.tracker.observe(&sample) {
            pipeline.dropped += 1;
            warn!(dropped = pipeline.dropped, "sample dropped: {}", e);
            return None;
        }
        pipeline.store.append(sample.clone());

        // Fan out before releasing the lock so subscribers observe samples
        // in arrival order; pushes never block.
        self.broadcaster.fanout(&sample);
        Some(sample)
    }

    /// Attach a subscriber, seeding it with the last `n` retained samples.
    ///
    /// The snapshot and the registration happen under the pipeline lock,
    /// the same lock `ingest` fans out under, so a concurrently ingested
    /// sample lands either in the history push or in a later fanout, never
    /// in neither.
    pub fn subscribe(&self, handle: Box<dyn Subscriber>, n: usize) -> SubscriberId {
        let pipeline = self.lock();
        self.broadcaster.subscribe(handle, pipeline.store.snapshot(n))
    }

    /// Retained samples newer than `since`, or the full buffer.
    pub fn history(&self, since: Option<DateTime<Utc>>) -> Vec<Sample> {
        self.lock().store.query(since)
    }

    /// Running aggregate statistics.
    pub fn stats(&self) -> AggregateStats {
        self.lock().tracker.stats()
    }

    /// Retained transition log, oldest-first.
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.lock().tracker.events().cloned().collect()
    }

    /// All-time ingestion counters.
    pub fn counters(&self) -> IngestCounters {
        let pipeline = self.lock();
        IngestCounters {
            total_written: pipeline.store.total_written(),
            total_drowsy: pipeline.store.total_drowsy(),
            dropped: pipeline.dropped,
            retained: pipeline.store.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pipeline> {
        // A poisoned lock would only follow a panic inside the pipeline;
        // the data structures stay coherent, so recover the guard.
        self.pipeline.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Coerce the producer's `isDrowsy` field to a boolean.
///
/// Booleans pass through; numbers follow truthiness (0 is false). Anything
/// else, including an absent field, is a format error.
fn coerce_drowsy(value: Option<&Value>) -> Result<bool, IngestError> {
    match value {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
        _ => Err(IngestError::InvalidSampleFormat(
            "isDrowsy must be a boolean value".to_string(),
        )),
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, IngestError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            IngestError::InvalidSampleFormat(format!("timestamp is not valid ISO-8601: {text}"))
        })
}
