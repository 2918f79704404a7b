//! Configuration management for the infergate agent

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Environment variable consulted for the bearer token when the config file
/// does not set one.
pub const AUTH_TOKEN_ENV: &str = "GATE_AUTH_TOKEN";

/// Complete configuration for the infergate agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Inference engine endpoint configuration
    pub engine: EngineConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Telemetry sampler configuration
    pub telemetry: TelemetryConfig,

    /// Model bootstrap configuration
    pub models: ModelsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener on
    pub bind_addr: SocketAddr,
}

/// Inference engine endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the engine's HTTP API
    pub base_url: Url,

    /// Timeout for bounded engine calls (tags, generate). Pull streams are
    /// long-running by nature and carry no timeout.
    pub request_timeout_seconds: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Static bearer token compared verbatim against incoming credentials
    pub token: String,
}

/// Telemetry sampler configuration
///
/// The log gate opens when utilization exceeds `activity_threshold_percent`,
/// or during a `heartbeat_window_seconds` wide window once every
/// `heartbeat_period_seconds` of wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Seconds between GPU samples
    pub sample_interval_seconds: u64,

    /// Utilization percentage above which every sample is logged
    pub activity_threshold_percent: f64,

    /// Wall-clock period of the low-rate heartbeat log window
    pub heartbeat_period_seconds: u64,

    /// Width of the heartbeat log window
    pub heartbeat_window_seconds: u64,
}

/// Model bootstrap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Models pulled and load-tested by the startup operation, in order
    pub defaults: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,

    /// Show target in logs
    pub show_target: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("valid default bind addr"),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://localhost:11434").expect("valid default engine url"),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: std::env::var(AUTH_TOKEN_ENV).unwrap_or_default(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            sample_interval_seconds: 2,
            activity_threshold_percent: 20.0,
            heartbeat_period_seconds: 30,
            heartbeat_window_seconds: 2,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            defaults: vec!["qwen3:8b".to_string(), "qwen3:4b-instruct".to_string()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            show_target: false,
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineConfig::default(),
            auth: AuthConfig::default(),
            telemetry: TelemetryConfig::default(),
            models: ModelsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Timeout for bounded engine calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl TelemetryConfig {
    /// Interval between samples
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(self.sample_interval_seconds)
    }
}

impl ModelsConfig {
    /// The model used when an inference request names none
    pub fn default_model(&self) -> Option<&str> {
        self.defaults.first().map(String::as_str)
    }
}

impl GateConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&contents)?;
        debug!("loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Write configuration to a YAML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path.as_ref(), yaml)?;
        debug!("wrote configuration to {}", path.as_ref().display());
        Ok(())
    }

    /// Set the engine base URL
    pub fn with_engine_url(mut self, url: &str) -> Result<Self> {
        self.engine.base_url =
            Url::parse(url).map_err(|e| Error::config(format!("invalid engine url: {e}")))?;
        Ok(self)
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth.token = token.into();
        self
    }

    /// Set the HTTP bind address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.server.bind_addr = addr;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth.token.is_empty() {
            return Err(Error::config(format!(
                "auth token is empty (set auth.token or {AUTH_TOKEN_ENV})"
            )));
        }

        if !matches!(self.engine.base_url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "engine base_url must be http(s), got {}",
                self.engine.base_url.scheme()
            )));
        }

        if self.engine.request_timeout_seconds == 0 {
            return Err(Error::config("engine request timeout must be non-zero"));
        }

        if self.telemetry.sample_interval_seconds == 0 {
            return Err(Error::config("telemetry sample interval must be non-zero"));
        }

        if self.telemetry.heartbeat_window_seconds >= self.telemetry.heartbeat_period_seconds {
            return Err(Error::config(
                "telemetry heartbeat window must be shorter than the heartbeat period",
            ));
        }

        Ok(())
    }
}
