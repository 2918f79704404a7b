//! Main binary for the infergate agent daemon (gated)

use clap::{Parser, Subcommand};
use gate_agent::{init_logging, server, AgentError, AppState, Result};
use gate_core::GateConfig;
use gate_gpu::{NvidiaSmiQuery, TelemetrySampler};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gated")]
#[command(about = "Control-plane agent for a local inference engine")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// HTTP bind address override
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Inference engine base URL override
    #[arg(long, value_name = "URL")]
    engine_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the agent
    Start {
        /// Override configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Generate default configuration
    Config {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate configuration
    Validate {
        /// Configuration file to validate
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Start { ref config }) => {
            let config_path = config.clone().or(cli.config.clone());
            start_agent(config_path, &cli).await
        }
        Some(Commands::Config { output }) => generate_config(output),
        Some(Commands::Validate { config }) => validate_config(config),
        None => {
            let config_path = cli.config.clone();
            start_agent(config_path, &cli).await
        }
    }
}

async fn start_agent(config_path: Option<PathBuf>, cli: &Cli) -> Result<()> {
    // Load configuration
    let mut config = if let Some(config_path) = config_path {
        GateConfig::from_file(&config_path).map_err(AgentError::Core)?
    } else {
        GateConfig::default()
    };

    // Apply CLI overrides
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(ref url) = cli.engine_url {
        config = config.with_engine_url(url).map_err(AgentError::Core)?;
    }

    init_logging(&config.logging)?;
    config.validate().map_err(AgentError::Core)?;

    let state = AppState::new(config.clone())?;

    // Background GPU telemetry, independent of request handling
    let sampler = TelemetrySampler::new(
        Arc::new(NvidiaSmiQuery::new()),
        state.state.clone(),
        config.telemetry.clone(),
    );
    sampler.spawn();

    info!("Starting infergate agent");
    info!("Engine: {}", config.engine.base_url);
    info!("Endpoints: /health, /startup, /pull_model, /serve_model, /metrics, /think");
    if let Some(default_model) = config.models.default_model() {
        info!("Default model: {default_model}");
    }
    info!("Listening on {}", config.server.bind_addr);

    if let Err(e) = server::serve(state).await {
        error!("Agent failed: {e}");
        std::process::exit(1);
    }

    Ok(())
}

fn generate_config(output: Option<PathBuf>) -> Result<()> {
    let config = GateConfig::default();

    if let Some(output_path) = output {
        config.to_file(&output_path).map_err(AgentError::Core)?;
        println!("Generated configuration file: {}", output_path.display());
    } else {
        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| AgentError::Config(format!("failed to serialize config: {e}")))?;
        println!("{yaml}");
    }

    Ok(())
}

fn validate_config(config_path: PathBuf) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = GateConfig::from_file(&config_path).map_err(AgentError::Core)?;
    config.validate().map_err(AgentError::Core)?;

    println!("Configuration is valid");
    println!("Engine: {}", config.engine.base_url);
    println!("Bind address: {}", config.server.bind_addr);
    println!("Default models: {}", config.models.defaults.join(", "));
    println!(
        "Telemetry: every {}s, log above {:.0}% or {}s window per {}s",
        config.telemetry.sample_interval_seconds,
        config.telemetry.activity_threshold_percent,
        config.telemetry.heartbeat_window_seconds,
        config.telemetry.heartbeat_period_seconds,
    );

    Ok(())
}
