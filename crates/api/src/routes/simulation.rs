//! Simulation Control Routes

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{ApiError, ApiSuccess, AppState};

/// Wire shape for `GET /api/simulation/status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationStatusResponse {
    pub active: bool,
    pub current_state: &'static str,
    /// All-time samples written, across every producer
    pub data_points: u64,
    /// All-time drowsy samples recorded
    pub alerts: u64,
}

/// Start the synthetic producer.
pub async fn start(State(state): State<Arc<AppState>>) -> Result<Json<ApiSuccess>, ApiError> {
    state.simulation.start().await?;
    Ok(Json(ApiSuccess::with_message("Simulation started")))
}

/// Stop the synthetic producer.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<Json<ApiSuccess>, ApiError> {
    state.simulation.stop().await?;
    Ok(Json(ApiSuccess::with_message("Simulation stopped")))
}

/// Report simulation status; read-only.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<SimulationStatusResponse> {
    let status = state.simulation.status();
    let counters = state.gateway.counters();

    Json(SimulationStatusResponse {
        active: status.active,
        current_state: if status.current_state {
            "drowsy"
        } else {
            "alert"
        },
        data_points: counters.total_written,
        alerts: counters.total_drowsy,
    })
}
