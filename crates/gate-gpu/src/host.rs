//! Host-level system stats
//!
//! Best-effort CPU/memory/disk utilization for the metrics report. Failures
//! degrade to zeros; host stats are a collaborator boundary, never an error
//! source.

use gate_core::HostStats;
use std::path::Path;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tokio::sync::Mutex;

/// Probe for local CPU, memory, and disk utilization
pub struct HostProbe {
    system: Mutex<System>,
}

impl HostProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Collect current host utilization
    ///
    /// CPU usage needs two refreshes a short interval apart to produce a
    /// meaningful delta, so this call blocks for the sysinfo minimum update
    /// interval (~200ms).
    pub async fn collect(&self) -> HostStats {
        let (cpu_percent, memory_percent) = {
            let mut system = self.system.lock().await;
            system.refresh_cpu_usage();
            tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
            system.refresh_cpu_usage();
            system.refresh_memory();

            let cpu = system.global_cpu_info().cpu_usage() as f64;
            let memory = if system.total_memory() > 0 {
                (system.used_memory() as f64 / system.total_memory() as f64) * 100.0
            } else {
                0.0
            };
            (cpu, memory)
        };

        HostStats {
            cpu_percent,
            memory_percent,
            disk_percent: Self::root_disk_percent(),
        }
    }

    /// Utilization of the disk mounted at `/`, falling back to the fullest
    /// disk when no root mount is visible.
    fn root_disk_percent() -> f64 {
        let disks = Disks::new_with_refreshed_list();

        let percent_of = |disk: &sysinfo::Disk| {
            let total = disk.total_space();
            if total == 0 {
                return 0.0;
            }
            let used = total.saturating_sub(disk.available_space());
            (used as f64 / total as f64) * 100.0
        };

        disks
            .iter()
            .find(|disk| disk.mount_point() == Path::new("/"))
            .map(percent_of)
            .or_else(|| {
                disks
                    .iter()
                    .map(percent_of)
                    .max_by(|a, b| a.total_cmp(b))
            })
            .unwrap_or(0.0)
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}
