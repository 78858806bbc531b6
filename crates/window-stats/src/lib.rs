//! Window Statistics
//!
//! Pure read-side computations over retained samples: time-window filtering
//! and the drowsy-percentage metric. No side effects; everything is
//! recomputed fully per call, which is fine at the store's bounded size.

mod query;

pub use query::{drowsy_percentage, recent_window, window_since};
