//! Point-in-time telemetry reporting
//!
//! Assembles the current GPU snapshot, host utilization, and the
//! loaded-model map into one response structure. The GPU fields come from a
//! single snapshot copy, never field-wise reads, so a report can never mix
//! values from different sample cycles.

use chrono::{DateTime, Utc};
use gate_core::{GpuSnapshot, HostStats, RuntimeState};
use gate_gpu::HostProbe;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds metrics reports from shared state and the host probe
pub struct TelemetryReporter {
    state: RuntimeState,
    host: Arc<HostProbe>,
}

/// GPU section of a metrics report, with the derived memory percentage
#[derive(Debug, Clone, Serialize)]
pub struct GpuReport {
    pub utilization: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    pub temperature_c: f64,
    pub memory_percent: f64,
}

impl From<GpuSnapshot> for GpuReport {
    fn from(snapshot: GpuSnapshot) -> Self {
        let memory_percent = snapshot.memory_percent();
        Self {
            utilization: snapshot.utilization,
            memory_used_mb: snapshot.memory_used_mb,
            memory_total_mb: snapshot.memory_total_mb,
            temperature_c: snapshot.temperature_c,
            memory_percent,
        }
    }
}

/// Complete metrics report for the `/metrics` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub gpu: GpuReport,
    pub system: HostStats,
    pub models_loaded: BTreeMap<String, DateTime<Utc>>,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryReporter {
    pub fn new(state: RuntimeState, host: Arc<HostProbe>) -> Self {
        Self { state, host }
    }

    /// Assemble a report from the current state
    pub async fn report(&self) -> MetricsReport {
        let gpu = self.state.gpu_snapshot().await;
        let system = self.host.collect().await;

        MetricsReport {
            gpu: gpu.into(),
            system,
            models_loaded: self.state.loaded_models(),
            timestamp: Utc::now(),
        }
    }
}
