//! Window filtering and percentage computation

use chrono::{DateTime, Duration, Utc};
use sample_store::Sample;

/// Filter to samples with `timestamp >= now - hours`.
///
/// `hours` may be fractional; consumers pass it straight from query
/// parameters. Isolated out-of-order timestamps are tolerated because this
/// filters by value rather than assuming sorted input.
pub fn recent_window(samples: &[Sample], now: DateTime<Utc>, hours: f64) -> Vec<Sample> {
    let cutoff = now - Duration::milliseconds((hours * 3_600_000.0) as i64);
    window_since(samples, cutoff)
}

/// Filter to samples with `timestamp >= cutoff`.
pub fn window_since(samples: &[Sample], cutoff: DateTime<Utc>) -> Vec<Sample> {
    samples
        .iter()
        .filter(|s| s.timestamp >= cutoff)
        .cloned()
        .collect()
}

/// Percentage of drowsy samples in the window, rounded half-up to an
/// integer in [0, 100]. An empty window yields 0.
pub fn drowsy_percentage(window: &[Sample]) -> u8 {
    if window.is_empty() {
        return 0;
    }

    let drowsy = window.iter().filter(|s| s.is_drowsy).count();
    (100.0 * drowsy as f64 / window.len() as f64).round() as u8
}
