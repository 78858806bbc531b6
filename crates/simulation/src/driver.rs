//! Simulation driver implementation

use crate::SimulationError;
use ingestion::IngestionGateway;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Period between synthesized samples
    pub tick_interval: Duration,
    /// Probability of flipping the simulated state on each tick (0.0 to 1.0)
    pub flip_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            flip_probability: 0.2,
        }
    }
}

/// Read-only projection of the simulation state.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationStatus {
    pub active: bool,
    pub current_state: bool,
    pub sample_count: u64,
    pub transition_count: usize,
}

/// Timer-driven synthetic producer.
///
/// Mutually exclusive with manual/real input by convention only; samples go
/// through the same gateway choke point as every other producer.
pub struct SimulationDriver {
    config: SimulationConfig,
    gateway: Arc<IngestionGateway>,
    /// Simulated state; persists across start/stop cycles.
    state: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SimulationDriver {
    pub fn new(config: SimulationConfig, gateway: Arc<IngestionGateway>) -> Self {
        let config = SimulationConfig {
            flip_probability: config.flip_probability.clamp(0.0, 1.0),
            ..config
        };
        Self {
            config,
            gateway,
            state: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
            task: tokio::sync::Mutex::new(None),
        }
    }

    /// Begin the periodic timer. Fails with `AlreadyRunning` when a
    /// simulation is active.
    pub async fn start(&self) -> Result<(), SimulationError> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Err(SimulationError::AlreadyRunning);
        }

        let gateway = self.gateway.clone();
        let state = self.state.clone();
        let period = self.config.tick_interval;
        let flip_probability = self.config.flip_probability;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Consume the immediate first tick; the first sample lands one
            // full period after start, like the original timer.
            interval.tick().await;

            loop {
                interval.tick().await;

                let mut next = state.load(Ordering::SeqCst);
                if rand::thread_rng().gen_bool(flip_probability) {
                    next = !next;
                    info!(
                        state = if next { "DROWSY" } else { "ALERT" },
                        "simulation state changed"
                    );
                    state.store(next, Ordering::SeqCst);
                }

                if gateway.ingest_state(next).is_none() {
                    debug!("simulated sample dropped by gateway");
                }
            }
        });

        *task = Some(handle);
        self.active.store(true, Ordering::SeqCst);
        info!(period_ms = period.as_millis() as u64, "simulation started");
        Ok(())
    }

    /// Cancel the timer. Fails with `NotRunning` when no simulation is
    /// active. No tick completes after this returns: the task is aborted and
    /// awaited before the call resolves.
    pub async fn stop(&self) -> Result<(), SimulationError> {
        let mut task = self.task.lock().await;
        let handle = task.take().ok_or(SimulationError::NotRunning)?;

        self.active.store(false, Ordering::SeqCst);
        handle.abort();
        let _ = handle.await;

        info!("simulation stopped");
        Ok(())
    }

    /// Read-only status projection; no side effects.
    pub fn status(&self) -> SimulationStatus {
        SimulationStatus {
            active: self.active.load(Ordering::SeqCst),
            current_state: self.state.load(Ordering::SeqCst),
            sample_count: self.gateway.counters().total_written,
            transition_count: self.gateway.stats().transition_count,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broadcast::Broadcaster;

    fn driver(tick_secs: u64, flip_probability: f64) -> SimulationDriver {
        let gateway = Arc::new(IngestionGateway::new(Arc::new(Broadcaster::new())));
        SimulationDriver::new(
            SimulationConfig {
                tick_interval: Duration::from_secs(tick_secs),
                flip_probability,
            },
            gateway,
        )
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let driver = driver(2, 0.0);
        driver.start().await.unwrap();

        let err = driver.start().await.unwrap_err();
        assert!(matches!(err, SimulationError::AlreadyRunning));

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_rejected() {
        let driver = driver(2, 0.0);
        let err = driver.stop().await.unwrap_err();
        assert!(matches!(err, SimulationError::NotRunning));
    }

    #[tokio::test]
    async fn test_stop_then_restart() {
        let driver = driver(2, 0.0);
        driver.start().await.unwrap();
        driver.stop().await.unwrap();
        driver.start().await.unwrap();
        driver.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_produce_samples() {
        let driver = driver(2, 0.0);
        driver.start().await.unwrap();

        // Paused clock: ticks fire deterministically at 2s, 4s, 6s.
        tokio::time::sleep(Duration::from_secs(7)).await;
        driver.stop().await.unwrap();

        let status = driver.status();
        assert_eq!(status.sample_count, 3);
        assert!(!status.current_state); // flip probability zero
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let driver = driver(2, 0.0);
        driver.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        driver.stop().await.unwrap();

        let count = driver.status().sample_count;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(driver.status().sample_count, count);
        assert!(!driver.status().active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_certain_flip_toggles_state() {
        let driver = driver(2, 1.0);
        driver.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await; // one tick
        assert!(driver.status().current_state);

        tokio::time::sleep(Duration::from_secs(2)).await; // second tick
        assert!(!driver.status().current_state);

        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_status_is_read_only() {
        let driver = driver(2, 0.2);
        let before = driver.status();
        let after = driver.status();
        assert_eq!(before.sample_count, after.sample_count);
        assert!(!after.active);
    }
}
