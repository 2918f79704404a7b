//! # gate-agent
//!
//! The infergate agent: model pull/load orchestration against the inference
//! engine, the point-in-time telemetry reporter, bearer-token auth, and the
//! axum HTTP surface served by the `gated` daemon.

pub mod auth;
pub mod orchestrator;
pub mod reporter;
pub mod server;

// Re-export commonly used types
pub use auth::AuthToken;
pub use orchestrator::{LoadOutcome, ModelOrchestrator, PullReport, StartupReport};
pub use reporter::{MetricsReport, TelemetryReporter};
pub use server::AppState;

/// Errors raised while bringing the agent up or serving
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error(transparent)]
    Core(#[from] gate_core::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] gate_engine::EngineError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

/// Initialize logging and tracing from the agent configuration
pub fn init_logging(logging_config: &gate_core::LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging_config.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(logging_config.show_target);

    match logging_config.format.as_str() {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }

    Ok(())
}
