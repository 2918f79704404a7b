//! Background GPU telemetry sampler
//!
//! Polls the GPU query backend on a fixed cadence and publishes every
//! successful sample into the shared runtime state as one wholesale snapshot
//! replace. The loop never returns and never propagates a query failure: a
//! failed cycle keeps the previous snapshot and the loop continues.

use crate::query::GpuQuery;
use gate_core::{GpuSnapshot, RuntimeState, TelemetryConfig};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

/// Long-lived sampler task polling GPU state into [`RuntimeState`]
pub struct TelemetrySampler {
    query: Arc<dyn GpuQuery>,
    state: RuntimeState,
    config: TelemetryConfig,
}

impl TelemetrySampler {
    pub fn new(query: Arc<dyn GpuQuery>, state: RuntimeState, config: TelemetryConfig) -> Self {
        Self {
            query,
            state,
            config,
        }
    }

    /// Spawn the sampling loop as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the sampling loop forever
    pub async fn run(self) {
        info!(
            interval_seconds = self.config.sample_interval_seconds,
            "starting GPU telemetry sampler"
        );

        let mut ticker = interval(self.config.sample_interval());
        loop {
            ticker.tick().await;
            self.sample_once().await;
        }
    }

    /// Execute one sample cycle: query, publish on success, log when the
    /// activity or heartbeat gate is open. Failures are swallowed.
    pub async fn sample_once(&self) {
        match self.query.sample().await {
            Ok(snapshot) => {
                self.state.publish_gpu(snapshot.clone()).await;

                let now_secs = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                if should_log(snapshot.utilization, now_secs, &self.config) {
                    info!(
                        "GPU util={:.1}% | mem={:.0}/{:.0}MB ({:.1}%) | temp={:.0}C",
                        snapshot.utilization,
                        snapshot.memory_used_mb,
                        snapshot.memory_total_mb,
                        snapshot.memory_percent(),
                        snapshot.temperature_c
                    );
                }
            }
            Err(e) => {
                debug!("GPU sample failed, keeping previous snapshot: {e}");
            }
        }
    }

    /// Current published snapshot (test convenience)
    pub async fn snapshot(&self) -> GpuSnapshot {
        self.state.gpu_snapshot().await
    }
}

/// Whether a sample should be logged: always under load, otherwise only
/// inside the periodic heartbeat window.
pub fn should_log(utilization: f64, now_secs: u64, config: &TelemetryConfig) -> bool {
    if utilization > config.activity_threshold_percent {
        return true;
    }
    config.heartbeat_period_seconds > 0
        && now_secs % config.heartbeat_period_seconds < config.heartbeat_window_seconds
}
