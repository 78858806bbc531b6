//! Alert/drowsy state machine implementation

use crate::TrackerError;
use chrono::{DateTime, Duration, Utc};
use sample_store::Sample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Default transition log retention (drop-oldest, same policy as the store)
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// Kind of state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransitionKind {
    DrowsyStart,
    DrowsyEnd,
}

/// One alert/drowsy transition.
///
/// `duration_ms` is present only on `DrowsyEnd` and equals the elapsed time
/// since the matching `DrowsyStart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    #[serde(rename = "type")]
    pub kind: TransitionKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
}

/// Derived running statistics, recomputable at any time.
///
/// `total_drowsy` accounts for closed drowsy intervals only; an in-progress
/// interval is not included until it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateStats {
    pub current_state: bool,
    pub total_drowsy: Duration,
    pub open_drowsy_start: Option<DateTime<Utc>>,
    pub transition_count: usize,
}

/// State machine over two states, `Alert` and `Drowsy`, triggered solely by
/// the incoming sample's drowsy flag. Runs for the process lifetime; there
/// is no terminal state.
pub struct TransitionTracker {
    current_state: bool,
    open_drowsy_start: Option<DateTime<Utc>>,
    total_drowsy: Duration,
    last_update: Option<DateTime<Utc>>,
    transition_count: usize,
    events: VecDeque<TransitionEvent>,
    event_capacity: usize,
}

impl TransitionTracker {
    /// Create a tracker in the initial `Alert` state.
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a tracker with a custom transition log cap. A cap below 1 is
    /// clamped to 1; the eviction loop requires room for at least one event.
    pub fn with_event_capacity(event_capacity: usize) -> Self {
        let event_capacity = event_capacity.max(1);
        Self {
            current_state: false,
            open_drowsy_start: None,
            total_drowsy: Duration::zero(),
            last_update: None,
            transition_count: 0,
            events: VecDeque::new(),
            event_capacity,
        }
    }

    /// Process the next sample in arrival order.
    ///
    /// Returns the transition event emitted by this sample, if any. The very
    /// first sample never emits an event, even when drowsy; it only
    /// initializes the state and, if drowsy, opens an interval silently.
    ///
    /// Samples older than the last processed one are rejected with
    /// `OutOfOrderSample`; the caller decides whether to surface or drop.
    pub fn observe(&mut self, sample: &Sample) -> Result<Option<TransitionEvent>, TrackerError> {
        if let Some(last) = self.last_update {
            if sample.timestamp < last {
                return Err(TrackerError::OutOfOrderSample {
                    timestamp: sample.timestamp,
                    last_update: last,
                });
            }
        } else {
            // First sample: initialize without emitting.
            self.current_state = sample.is_drowsy;
            if sample.is_drowsy {
                self.open_drowsy_start = Some(sample.timestamp);
            }
            self.last_update = Some(sample.timestamp);
            return Ok(None);
        }

        let event = if sample.is_drowsy == self.current_state {
            None
        } else if sample.is_drowsy {
            self.open_drowsy_start = Some(sample.timestamp);
            debug!(timestamp = %sample.timestamp, "drowsy interval opened");
            Some(self.record(TransitionKind::DrowsyStart, sample.timestamp, None))
        } else {
            // Closing an interval; the open start is always set while drowsy.
            let duration = self
                .open_drowsy_start
                .take()
                .map(|start| sample.timestamp - start)
                .unwrap_or_else(Duration::zero);
            self.total_drowsy = self.total_drowsy + duration;
            debug!(
                timestamp = %sample.timestamp,
                duration_ms = duration.num_milliseconds(),
                "drowsy interval closed"
            );
            Some(self.record(
                TransitionKind::DrowsyEnd,
                sample.timestamp,
                Some(duration.num_milliseconds()),
            ))
        };

        self.current_state = sample.is_drowsy;
        self.last_update = Some(sample.timestamp);
        Ok(event)
    }

    fn record(
        &mut self,
        kind: TransitionKind,
        timestamp: DateTime<Utc>,
        duration_ms: Option<i64>,
    ) -> TransitionEvent {
        let event = TransitionEvent {
            kind,
            timestamp,
            duration_ms,
        };

        while self.events.len() >= self.event_capacity {
            self.events.pop_front();
        }
        self.events.push_back(event.clone());
        self.transition_count += 1;

        event
    }

    /// Current snapshot of the running statistics.
    pub fn stats(&self) -> AggregateStats {
        AggregateStats {
            current_state: self.current_state,
            total_drowsy: self.total_drowsy,
            open_drowsy_start: self.open_drowsy_start,
            transition_count: self.transition_count,
        }
    }

    /// The retained transition log, oldest-first.
    pub fn events(&self) -> impl Iterator<Item = &TransitionEvent> {
        self.events.iter()
    }

    /// Current binary state (true = drowsy).
    pub fn current_state(&self) -> bool {
        self.current_state
    }

    /// Timestamp of the last processed sample.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Number of transitions ever recorded (survives log eviction).
    pub fn transition_count(&self) -> usize {
        self.transition_count
    }
}

impl Default for TransitionTracker {
    fn default() -> Self {
        Self::new()
    }
}
