//! Server configuration

use serde::{Deserialize, Serialize};

/// Server configuration, overridable via `DROWSY_*` environment variables
/// (e.g. `DROWSY_BIND_ADDR`, `DROWSY_SIMULATION_TICK_MS`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Retained sample cap (drop-oldest)
    pub store_capacity: usize,

    /// History snapshot size pushed to new subscribers
    pub snapshot_size: usize,

    /// Simulation timer period (milliseconds)
    pub simulation_tick_ms: u64,

    /// Per-tick probability of flipping the simulated state
    pub simulation_flip_probability: f64,

    /// Rate limit: seconds per replenished request on ingestion routes
    pub rate_limit_per_second: u64,

    /// Rate limit: burst size on ingestion routes
    pub rate_limit_burst: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            store_capacity: 1000,
            snapshot_size: 100,
            simulation_tick_ms: 2000,
            simulation_flip_probability: 0.2,
            rate_limit_per_second: 1,
            rate_limit_burst: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment, falling back to defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("DROWSY").try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
