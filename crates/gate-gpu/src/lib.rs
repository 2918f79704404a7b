//! # gate-gpu
//!
//! GPU telemetry for infergate: a pluggable [`GpuQuery`] backend (nvidia-smi,
//! or a mock for tests), a host-stats probe, and the background
//! [`TelemetrySampler`] that polls the GPU on a fixed cadence and publishes
//! into the shared runtime state.
//!
//! Query failures are expected transients: the sampler logs them and keeps
//! the previous snapshot. Nothing in this crate can take the process down.

use thiserror::Error;

pub mod host;
pub mod query;
pub mod sampler;

// Re-export main types
pub use host::HostProbe;
pub use query::{GpuQuery, MockGpuQuery, NvidiaSmiQuery};
pub use sampler::TelemetrySampler;

/// Result type for GPU operations
pub type Result<T> = std::result::Result<T, GpuError>;

/// Errors that can occur while querying GPU telemetry
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("GPU query command failed: {0}")]
    CommandFailed(String),

    #[error("Malformed GPU query output: {0}")]
    Malformed(String),

    #[error("GPU unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid UTF-8 in GPU query output: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}
