//! HTTP server for the infergate agent
//!
//! Binds the abstract operations (health, startup, pull, serve, metrics,
//! infer) onto concrete axum routes. Every failure path returns a structured
//! JSON body with the taxonomy's status code; handlers never surface a bare
//! transport error.

use crate::auth::AuthToken;
use crate::orchestrator::ModelOrchestrator;
use crate::reporter::{MetricsReport, TelemetryReporter};
use crate::{AgentError, Result};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use gate_core::{Error, GateConfig, RuntimeState};
use gate_engine::{EngineClient, GenerateRequest};
use gate_gpu::HostProbe;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ModelOrchestrator>,
    pub reporter: Arc<TelemetryReporter>,
    pub engine: Arc<EngineClient>,
    pub state: RuntimeState,
    pub auth: AuthToken,
    pub config: GateConfig,
}

impl AppState {
    /// Build the application state from configuration
    pub fn new(config: GateConfig) -> Result<Self> {
        let engine = Arc::new(EngineClient::new(
            config.engine.base_url.clone(),
            config.engine.request_timeout(),
        )?);
        let state = RuntimeState::new();
        let orchestrator = Arc::new(ModelOrchestrator::new(engine.clone(), state.clone()));
        let reporter = Arc::new(TelemetryReporter::new(
            state.clone(),
            Arc::new(HostProbe::new()),
        ));
        let auth = AuthToken::new(config.auth.token.clone());

        Ok(Self {
            orchestrator,
            reporter,
            engine,
            state,
            auth,
            config,
        })
    }
}

/// Create the axum router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/startup", post(run_startup))
        .route("/pull_model", post(pull_model))
        .route("/serve_model", post(serve_model))
        .route("/metrics", get(metrics))
        .route("/think", post(think))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve HTTP requests until a shutdown signal arrives
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.server.bind_addr;
    let app = build_router(state);

    info!("Starting HTTP server on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AgentError::Server(format!("failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AgentError::Server(format!("HTTP server failed: {e}")))?;

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                let _ = signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => info!("Received Ctrl+C signal"),
            _ = sigterm.recv() => info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
        info!("Received Ctrl+C signal");
    }
}

/// Taxonomy error rendered as a structured JSON response
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.to_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match &self.0 {
            Error::ModelNotFound { model, available } => json!({
                "error": format!("Model {model} not found"),
                "available_models": available,
            }),
            err => json!({ "error": err.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

/// Request body naming a model
#[derive(Debug, Default, Deserialize)]
struct ModelRequest {
    model: Option<String>,
}

impl ModelRequest {
    fn model(self) -> std::result::Result<String, ApiError> {
        self.model
            .filter(|model| !model.is_empty())
            .ok_or_else(|| Error::bad_request("Missing 'model' in request body").into())
    }
}

/// Inference request body
#[derive(Debug, Default, Deserialize)]
struct ThinkRequest {
    model: Option<String>,
    prompt: Option<String>,
    stream: Option<bool>,
    options: Option<Value>,
}

/// Engine reachability, catalog, and default-model flags. No auth required.
async fn health(State(app): State<AppState>) -> Response {
    match app.engine.list_models().await {
        Ok(models) => {
            // The engine already has these; fold them into the known set
            for model in &models {
                app.state.mark_known(&model.name).await;
            }

            let model_list: Vec<Value> = models
                .iter()
                .map(|model| {
                    json!({
                        "name": model.name,
                        "size": format!("{:.1}GB", model.size as f64 / 1e9),
                        "is_default": app.config.models.defaults.contains(&model.name),
                    })
                })
                .collect();

            Json(json!({
                "status": "healthy",
                "models_available": model_list,
                "models_count": models.len(),
                "default_model": app.config.models.default_model(),
                "timestamp": Utc::now(),
            }))
            .into_response()
        }
        Err(e) => {
            error!("Health check error: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "unhealthy", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Pull and load-test the configured default models
async fn run_startup(
    State(app): State<AppState>,
    headers: HeaderMap,
) -> std::result::Result<Json<Value>, ApiError> {
    app.auth.authorize(&headers)?;

    info!("Starting model initialization...");
    let report = app.orchestrator.startup(&app.config.models.defaults).await;

    Ok(Json(json!({
        "message": "Startup initialization complete",
        "results": report.results,
        "models_loaded": report.models_loaded,
        "timestamp": Utc::now(),
    })))
}

/// Pull a single model by name
async fn pull_model(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<ModelRequest>>,
) -> std::result::Result<Json<Value>, ApiError> {
    app.auth.authorize(&headers)?;
    let model = body.map(|Json(req)| req).unwrap_or_default().model()?;

    let summary = app.orchestrator.pull_model(&model).await?;

    Ok(Json(json!({
        "success": summary.is_success(),
        "model": model,
        "message": summary.last_status,
    })))
}

/// Load ("serve") a model, verifying availability first
async fn serve_model(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<ModelRequest>>,
) -> std::result::Result<Json<Value>, ApiError> {
    app.auth.authorize(&headers)?;
    let model = body.map(|Json(req)| req).unwrap_or_default().model()?;

    let outcome = app.orchestrator.load_model(&model).await?;

    Ok(Json(json!({
        "success": true,
        "model": outcome.model,
        "message": format!("Model {model} loaded"),
        "loaded_at": outcome.loaded_at,
    })))
}

/// Point-in-time telemetry snapshot. No auth required.
async fn metrics(State(app): State<AppState>) -> Json<MetricsReport> {
    Json(app.reporter.report().await)
}

/// Forward an inference request to the engine, augmenting the result with
/// current GPU utilization and measured wall-clock duration.
async fn think(
    State(app): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<ThinkRequest>>,
) -> std::result::Result<Json<Value>, ApiError> {
    app.auth.authorize(&headers)?;

    let req = body.map(|Json(req)| req).unwrap_or_default();
    let prompt = req
        .prompt
        .filter(|prompt| !prompt.is_empty())
        .ok_or_else(|| Error::bad_request("Missing 'prompt' in request body"))?;
    let model = req
        .model
        .or_else(|| app.config.models.default_model().map(str::to_string))
        .ok_or_else(|| Error::bad_request("no model named and no default configured"))?;

    info!("Inference: model={model}, prompt_length={}", prompt.len());

    let request = GenerateRequest {
        model: model.clone(),
        prompt,
        stream: req.stream.unwrap_or(false),
        options: req.options.unwrap_or(Value::Null),
    };

    let start = Instant::now();
    let generated = app
        .engine
        .generate(&request)
        .await
        .map_err(|e| Error::Upstream(e.to_string()))?;
    let inference_time = start.elapsed().as_secs_f64();

    let gpu = app.state.gpu_snapshot().await;
    info!(
        "Inference done in {inference_time:.2}s | GPU: {}% ({}MB)",
        gpu.utilization, gpu.memory_used_mb
    );

    Ok(Json(json!({
        "model": model,
        "response": generated.response,
        "done": generated.done,
        "total_duration": generated.total_duration,
        "gpu_utilization": gpu.utilization,
        "inference_time": inference_time,
    })))
}
