//! Statistics Routes
//!
//! Rollup views for the dashboard cards: running totals, the transition
//! log, and the windowed drowsy percentage.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use transition_tracker::TransitionEvent;

/// Wire shape for `GET /api/stats`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub is_drowsy: bool,
    /// Closed drowsy intervals only; an open interval counts once it ends
    pub total_drowsy_time_ms: i64,
    pub drowsy_start_time: Option<DateTime<Utc>>,
    pub state_changes: usize,
    /// Percentage of drowsy samples over the last hour
    pub drowsy_percentage: u8,
}

/// Get aggregate drowsiness statistics.
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.gateway.stats();
    let samples = state.gateway.history(None);
    let window = window_stats::recent_window(&samples, Utc::now(), 1.0);

    Json(StatsResponse {
        is_drowsy: stats.current_state,
        total_drowsy_time_ms: stats.total_drowsy.num_milliseconds(),
        drowsy_start_time: stats.open_drowsy_start,
        state_changes: stats.transition_count,
        drowsy_percentage: window_stats::drowsy_percentage(&window),
    })
}

/// Get the retained transition log, oldest-first.
pub async fn get_transitions(State(state): State<Arc<AppState>>) -> Json<Vec<TransitionEvent>> {
    Json(state.gateway.events())
}
