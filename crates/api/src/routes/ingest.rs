//! Ingestion Routes
//!
//! Producer-facing endpoints: the detector feed and the manual override.
//! Both funnel into the gateway choke point.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::{ApiError, ApiSuccess, AppState};
use ingestion::RawSample;

/// Receive a drowsiness sample from the detector.
///
/// The body is validated by the gateway: `isDrowsy` must be
/// boolean-coercible, `timestamp` (optional) must parse as ISO-8601.
/// Out-of-order samples are dropped internally and still answer success,
/// keeping ingestion best-effort for the producer.
pub async fn post_drowsiness(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RawSample>,
) -> Result<Json<ApiSuccess>, ApiError> {
    state.gateway.ingest(body)?;
    Ok(Json(ApiSuccess::ok()))
}

/// Manual override body; `isDrowsy` must be a strict boolean here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualStateBody {
    #[serde(default)]
    pub is_drowsy: Option<Value>,
}

/// Set the drowsiness state manually (testing without the ML model).
pub async fn post_manual_state(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ManualStateBody>,
) -> Result<Json<ApiSuccess>, ApiError> {
    let is_drowsy = match body.is_drowsy {
        Some(Value::Bool(b)) => b,
        _ => return Err(ApiError::bad_request("isDrowsy must be a boolean value")),
    };

    state.gateway.ingest_state(is_drowsy);
    Ok(Json(ApiSuccess::with_message(format!(
        "State set to {}",
        if is_drowsy { "drowsy" } else { "alert" }
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(ServerConfig::default()))
    }

    #[tokio::test]
    async fn test_post_drowsiness_success() {
        let state = state();
        let body = RawSample {
            is_drowsy: Some(Value::Bool(true)),
            timestamp: None,
        };

        let Json(response) = post_drowsiness(State(state.clone()), Json(body))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(state.gateway.counters().total_written, 1);
    }

    #[tokio::test]
    async fn test_post_drowsiness_invalid_body() {
        let err = post_drowsiness(State(state()), Json(RawSample::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_manual_state_strict_boolean() {
        let state = state();

        let err = post_manual_state(
            State(state.clone()),
            Json(ManualStateBody {
                is_drowsy: Some(Value::from(1)),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "isDrowsy must be a boolean value");

        let Json(response) = post_manual_state(
            State(state),
            Json(ManualStateBody {
                is_drowsy: Some(Value::Bool(true)),
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.message.as_deref(), Some("State set to drowsy"));
    }
}
