//! History Routes

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::AppState;
use sample_store::Sample;

/// Query parameters for the history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Look-back window in hours; full retained buffer when absent
    pub hours: Option<f64>,
}

/// Get retained samples, optionally filtered to the last `hours`.
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> Json<Vec<Sample>> {
    let since = params
        .hours
        .map(|hours| Utc::now() - Duration::milliseconds((hours * 3_600_000.0) as i64));

    Json(state.gateway.history(since))
}
