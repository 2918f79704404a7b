//! Error handling for infergate
//!
//! Provides a unified error type and result type for use across all infergate
//! components. Request handlers map these onto HTTP status codes via
//! [`Error::to_status_code`].

/// Result type alias for infergate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for infergate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or mismatched bearer credential
    #[error("Unauthorized")]
    Unauthorized,

    /// Invalid request or missing required field
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Model unknown to both the orchestrator and the live engine catalog
    #[error("Model {model} not found")]
    ModelNotFound {
        model: String,
        /// Names the engine currently reports, returned as a diagnostic
        available: Vec<String>,
    },

    /// Inference engine returned non-success or was unreachable
    #[error("Upstream engine error: {0}")]
    Upstream(String),

    /// GPU/host telemetry query failed (swallowed by the sampler, surfaced
    /// only when a caller asks for telemetry that cannot be produced)
    #[error("GPU telemetry error: {0}")]
    GpuTelemetry(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a bad request error
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create an upstream engine error
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Map this error onto an HTTP status code
    pub fn to_status_code(&self) -> u16 {
        match self {
            Error::Unauthorized => 401,
            Error::BadRequest(_) => 400,
            Error::ModelNotFound { .. } => 404,
            Error::Upstream(_) => 502,
            _ => 500,
        }
    }
}
