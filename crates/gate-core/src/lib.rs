//! # gate-core
//!
//! Shared foundation for infergate: the unified error taxonomy, agent
//! configuration, telemetry value types, and the concurrency-safe runtime
//! state handle shared between the sampler, orchestrator, and reporter.

pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{
    AuthConfig, EngineConfig, GateConfig, LoggingConfig, ModelsConfig, ServerConfig,
    TelemetryConfig,
};
pub use error::{Error, Result};
pub use state::RuntimeState;
pub use telemetry::{GpuSnapshot, HostStats};
