//! Telemetry value types
//!
//! Plain data carried between the GPU sampler, the runtime state, and the
//! metrics reporter. A [`GpuSnapshot`] is always replaced wholesale by the
//! sampler so readers never observe fields from different sample cycles.

use serde::{Deserialize, Serialize};

/// Point-in-time GPU telemetry for the host's GPU
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSnapshot {
    /// GPU busy percentage (0-100)
    pub utilization: f64,

    /// GPU memory in use, in megabytes
    pub memory_used_mb: f64,

    /// Total GPU memory, in megabytes
    pub memory_total_mb: f64,

    /// GPU temperature in degrees Celsius
    pub temperature_c: f64,
}

impl GpuSnapshot {
    /// Create a snapshot from raw query values
    pub fn new(utilization: f64, memory_used_mb: f64, memory_total_mb: f64, temperature_c: f64) -> Self {
        Self {
            utilization,
            memory_used_mb,
            memory_total_mb,
            temperature_c,
        }
    }

    /// Derived memory utilization percentage; 0 when total memory is unknown
    pub fn memory_percent(&self) -> f64 {
        if self.memory_total_mb > 0.0 {
            (self.memory_used_mb / self.memory_total_mb) * 100.0
        } else {
            0.0
        }
    }
}

/// Host-level utilization from the system stats collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    /// CPU utilization percentage
    pub cpu_percent: f64,

    /// Memory utilization percentage
    pub memory_percent: f64,

    /// Disk utilization percentage for the root filesystem
    pub disk_percent: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        let snapshot = GpuSnapshot::new(55.0, 4096.0, 8192.0, 70.0);
        assert!((snapshot.memory_percent() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_percent_zero_total() {
        let snapshot = GpuSnapshot::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(snapshot.memory_percent(), 0.0);

        // Used without total still reports 0 rather than dividing by zero
        let snapshot = GpuSnapshot::new(10.0, 512.0, 0.0, 40.0);
        assert_eq!(snapshot.memory_percent(), 0.0);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = GpuSnapshot::new(42.5, 2048.0, 16384.0, 61.0);
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: GpuSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
