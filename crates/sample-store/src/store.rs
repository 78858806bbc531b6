//! Drop-oldest bounded buffer implementation

use crate::Sample;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Default retained sample count (~33 min of history at one sample per 2s)
pub const DEFAULT_CAPACITY: usize = 1000;

/// Bounded, append-only buffer of drowsiness samples.
///
/// Oldest samples are evicted once the cap is exceeded; eviction is enforced
/// synchronously on every insert so `len() <= capacity()` holds at all times.
/// Samples with identical timestamps are all retained in arrival order.
pub struct SampleStore {
    samples: VecDeque<Sample>,
    capacity: usize,
    /// Total samples ever written (survives eviction)
    total_written: u64,
    /// Total drowsy samples ever written (survives eviction)
    total_drowsy: u64,
}

impl SampleStore {
    /// Create a store with the given capacity. A capacity below 1 is
    /// clamped to 1; the eviction loop requires room for at least one
    /// sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            total_drowsy: 0,
        }
    }

    /// Create a store with default capacity (1000 samples).
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Insert a sample at the tail, evicting from the head if over capacity.
    pub fn append(&mut self, sample: Sample) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }

        self.total_written += 1;
        if sample.is_drowsy {
            self.total_drowsy += 1;
        }
        self.samples.push_back(sample);
    }

    /// Return the last `n` samples (or fewer), oldest-first.
    ///
    /// Used to seed new subscribers with recent context.
    pub fn snapshot(&self, n: usize) -> Vec<Sample> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).cloned().collect()
    }

    /// Return retained samples with `timestamp > since`, or all samples
    /// when `since` is `None`. Linear scan; fine at this retention size.
    pub fn query(&self, since: Option<DateTime<Utc>>) -> Vec<Sample> {
        match since {
            Some(cutoff) => self
                .samples
                .iter()
                .filter(|s| s.timestamp > cutoff)
                .cloned()
                .collect(),
            None => self.samples.iter().cloned().collect(),
        }
    }

    /// Number of samples currently retained.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Retention cap.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total samples ever written (for status reporting).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Total drowsy samples ever written (for status reporting).
    pub fn total_drowsy(&self) -> u64 {
        self.total_drowsy
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_append_and_snapshot() {
        let mut store = SampleStore::new(10);
        for i in 0..5 {
            store.append(Sample::new(i % 2 == 0, ts(i)));
        }

        assert_eq!(store.len(), 5);

        let last = store.snapshot(3);
        assert_eq!(last.len(), 3);
        assert_eq!(last[0].timestamp, ts(2)); // Oldest of the last three
        assert_eq!(last[2].timestamp, ts(4));
    }

    #[test]
    fn test_snapshot_larger_than_store() {
        let mut store = SampleStore::new(10);
        store.append(Sample::new(false, ts(0)));
        assert_eq!(store.snapshot(100).len(), 1);
    }

    #[test]
    fn test_drop_oldest_eviction() {
        let mut store = SampleStore::new(5);
        for i in 0..12 {
            store.append(Sample::new(false, ts(i)));
        }

        assert_eq!(store.len(), 5);
        let retained = store.query(None);
        assert_eq!(retained[0].timestamp, ts(7));
        assert_eq!(retained[4].timestamp, ts(11));
        assert_eq!(store.total_written(), 12);
    }

    #[test]
    fn test_query_since_is_exclusive() {
        let mut store = SampleStore::new(10);
        for i in 0..4 {
            store.append(Sample::new(false, ts(i)));
        }

        let after = store.query(Some(ts(1)));
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].timestamp, ts(2));
    }

    #[test]
    fn test_duplicate_timestamps_retained_in_arrival_order() {
        let mut store = SampleStore::new(10);
        store.append(Sample::new(false, ts(5)));
        store.append(Sample::new(true, ts(5)));

        let all = store.query(None);
        assert_eq!(all.len(), 2);
        assert!(!all[0].is_drowsy);
        assert!(all[1].is_drowsy);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut store = SampleStore::new(0);
        store.append(Sample::new(true, ts(0)));
        store.append(Sample::new(false, ts(1)));

        // Clamped to a single slot; append must terminate and retain the
        // newest sample.
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.query(None)[0].timestamp, ts(1));
    }

    #[test]
    fn test_drowsy_counter() {
        let mut store = SampleStore::new(3);
        for i in 0..6 {
            store.append(Sample::new(i % 3 == 0, ts(i)));
        }
        assert_eq!(store.total_drowsy(), 2);
    }

    proptest! {
        /// For any overfull append sequence the store holds exactly the
        /// last `capacity` samples in arrival order.
        #[test]
        fn prop_bounded_to_last_capacity(flags in prop::collection::vec(any::<bool>(), 1001..1500)) {
            let mut store = SampleStore::with_default_capacity();
            for (i, &drowsy) in flags.iter().enumerate() {
                store.append(Sample::new(drowsy, ts(i as i64)));
            }

            prop_assert_eq!(store.len(), DEFAULT_CAPACITY);

            let retained = store.query(None);
            let expected = &flags[flags.len() - DEFAULT_CAPACITY..];
            for (sample, &drowsy) in retained.iter().zip(expected) {
                prop_assert_eq!(sample.is_drowsy, drowsy);
            }
        }
    }
}
