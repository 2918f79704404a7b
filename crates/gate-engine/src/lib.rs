//! # gate-engine
//!
//! HTTP client for the local inference engine's Ollama-compatible API:
//! catalog listing (`/api/tags`), streaming model pulls (`/api/pull`), and
//! test/inference generation (`/api/generate`), plus the newline-delimited
//! JSON progress parser that reduces a pull stream to its last status line.

use thiserror::Error;

pub mod client;
pub mod progress;

// Re-export main types
pub use client::{EngineClient, GenerateRequest, GenerateResponse, ModelEntry};
pub use progress::{consume_pull_stream, format_status, PullEvent, PullSummary};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur talking to the inference engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Engine returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl EngineError {
    /// Create an upstream error from a non-success engine response
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }
}
