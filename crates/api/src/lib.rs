//! Drowsiness Monitoring API Server
//!
//! REST API and WebSocket server for the drowsiness monitoring dashboard.
//! Wires the ingestion gateway, broadcaster, and simulation driver into an
//! explicitly constructed application state; no global singletons.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod rate_limit;
mod routes;
mod ws;

pub use config::ServerConfig;
pub use rate_limit::RateLimitConfig;

use broadcast::Broadcaster;
use ingestion::{IngestError, IngestionGateway};
use sample_store::SampleStore;
use simulation::{SimulationConfig, SimulationDriver, SimulationError};

/// Application state shared across handlers.
///
/// Owns the whole pipeline: producers write through `gateway`, subscribers
/// attach through `broadcaster`, and `simulation` is the optional synthetic
/// producer.
pub struct AppState {
    pub gateway: Arc<IngestionGateway>,
    pub broadcaster: Arc<Broadcaster>,
    pub simulation: SimulationDriver,
    pub config: ServerConfig,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct the pipeline from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let broadcaster = Arc::new(Broadcaster::new());
        let gateway = Arc::new(IngestionGateway::with_store(
            SampleStore::new(config.store_capacity),
            broadcaster.clone(),
        ));
        let simulation = SimulationDriver::new(
            SimulationConfig {
                tick_interval: Duration::from_millis(config.simulation_tick_ms),
                flip_probability: config.simulation_flip_probability,
            },
            gateway.clone(),
        );

        Self {
            gateway,
            broadcaster,
            simulation,
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// User-visible API error; serializes to `{"error": …}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<SimulationError> for ApiError {
    fn from(e: SimulationError) -> Self {
        Self::bad_request(e.to_string())
    }
}

/// Standard success envelope: `{"success": true, "message"?: …}`.
#[derive(Debug, Serialize)]
pub struct ApiSuccess {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiSuccess {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime: u64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let governor = rate_limit::create_governor_config(&RateLimitConfig {
        per_second: state.config.rate_limit_per_second,
        burst_size: state.config.rate_limit_burst,
    });

    // Only producer-facing routes are rate limited; read paths and the
    // WebSocket stay unthrottled.
    let ingest_routes = Router::new()
        .route("/api/drowsiness", post(routes::ingest::post_drowsiness))
        .route("/api/manual/state", post(routes::ingest::post_manual_state))
        .route_layer(GovernorLayer { config: governor });

    Router::new()
        .merge(ingest_routes)
        .route("/api/simulation/start", post(routes::simulation::start))
        .route("/api/simulation/stop", post(routes::simulation::stop))
        .route("/api/simulation/status", get(routes::simulation::status))
        .route("/api/drowsiness/history", get(routes::history::get_history))
        .route(
            "/api/drowsiness/transitions",
            get(routes::stats::get_transitions),
        )
        .route("/api/stats", get(routes::stats::get_stats))
        .route("/api/health", get(health_handler))
        .route("/ws", get(ws::handle_websocket))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime: state.start_time.elapsed().as_secs(),
        timestamp: Utc::now(),
        version: state.version.clone(),
    })
}

/// Initialize logging
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run the server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config));
    let app = create_router(state);

    info!("Starting API server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
