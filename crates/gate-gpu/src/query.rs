//! GPU query backends
//!
//! [`GpuQuery`] abstracts the source of GPU telemetry so the sampler can run
//! against the real `nvidia-smi` tool in production and a scripted mock in
//! tests.

use crate::{GpuError, Result};
use async_trait::async_trait;
use gate_core::GpuSnapshot;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::process::Command;
use tracing::debug;

/// Source of point-in-time GPU telemetry
#[async_trait]
pub trait GpuQuery: Send + Sync {
    /// Take one sample of GPU utilization, memory, and temperature
    async fn sample(&self) -> Result<GpuSnapshot>;
}

/// GPU query backed by the `nvidia-smi` command-line tool
pub struct NvidiaSmiQuery {
    command: String,
}

impl NvidiaSmiQuery {
    pub fn new() -> Self {
        Self {
            command: "nvidia-smi".to_string(),
        }
    }

    /// Override the queried binary (used by tests)
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Parse one CSV line of `utilization.gpu, memory.used, memory.total,
    /// temperature.gpu` with `noheader,nounits` formatting.
    fn parse_output(output: &str) -> Result<GpuSnapshot> {
        let line = output
            .lines()
            .next()
            .ok_or_else(|| GpuError::Malformed("empty output".to_string()))?;

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(GpuError::Malformed(format!(
                "expected 4 fields, got {}: {line:?}",
                fields.len()
            )));
        }

        let mut values = [0.0f64; 4];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field
                .parse()
                .map_err(|_| GpuError::Malformed(format!("non-numeric field {field:?}")))?;
        }

        Ok(GpuSnapshot::new(values[0], values[1], values[2], values[3]))
    }
}

impl Default for NvidiaSmiQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GpuQuery for NvidiaSmiQuery {
    async fn sample(&self) -> Result<GpuSnapshot> {
        let output = Command::new(&self.command)
            .args([
                "--query-gpu=utilization.gpu,memory.used,memory.total,temperature.gpu",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .await?;

        if !output.status.success() {
            return Err(GpuError::CommandFailed(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        let stdout = String::from_utf8(output.stdout)?;
        let snapshot = Self::parse_output(&stdout)?;
        debug!(
            utilization = snapshot.utilization,
            memory_used_mb = snapshot.memory_used_mb,
            "sampled GPU via {}",
            self.command
        );
        Ok(snapshot)
    }
}

/// Mock GPU query for testing
///
/// Returns scripted samples in order, then repeats the last one. A sample can
/// be an `Err` to exercise the sampler's keep-old-value path.
pub struct MockGpuQuery {
    script: Mutex<VecDeque<Result<GpuSnapshot>>>,
    fallback: GpuSnapshot,
}

impl MockGpuQuery {
    /// Mock that always returns the same snapshot
    pub fn fixed(snapshot: GpuSnapshot) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: snapshot,
        }
    }

    /// Mock that plays back the given results, then repeats `fallback`
    pub fn scripted(script: Vec<Result<GpuSnapshot>>, fallback: GpuSnapshot) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }
}

#[async_trait]
impl GpuQuery for MockGpuQuery {
    async fn sample(&self) -> Result<GpuSnapshot> {
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        Ok(self.fallback.clone())
    }
}
