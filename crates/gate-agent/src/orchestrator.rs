//! Model lifecycle orchestration
//!
//! Drives pull, load ("serve"), and bulk-startup workflows against the
//! inference engine while keeping the shared runtime state's model
//! bookkeeping consistent. All per-model processing is strictly sequential;
//! one model's failure never aborts the others during startup.

use chrono::{DateTime, Utc};
use gate_core::{Error, Result, RuntimeState};
use gate_engine::{consume_pull_stream, EngineClient, EngineError, GenerateRequest, PullSummary};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates model pulls and load tests against the engine
pub struct ModelOrchestrator {
    engine: Arc<EngineClient>,
    state: RuntimeState,
}

/// Per-model result record from a startup run
#[derive(Debug, Clone, Serialize)]
pub struct PullReport {
    pub model: String,
    pub status: String,
    pub message: String,
}

/// Aggregated result of a bulk startup
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub results: Vec<PullReport>,
    pub models_loaded: Vec<String>,
}

/// Result of a successful load test
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    pub model: String,
    pub loaded_at: DateTime<Utc>,
}

fn upstream(e: EngineError) -> Error {
    Error::Upstream(e.to_string())
}

impl ModelOrchestrator {
    pub fn new(engine: Arc<EngineClient>, state: RuntimeState) -> Self {
        Self { engine, state }
    }

    /// Pull a model, streaming progress to the log
    ///
    /// The model is marked known only when the stream's final event is the
    /// engine's explicit `success` status; an interrupted or error-terminated
    /// stream returns its last status without marking the model available.
    pub async fn pull_model(&self, model: &str) -> Result<PullSummary> {
        info!("Pulling model: {model}");

        let response = self.engine.pull(model).await.map_err(upstream)?;
        let summary = consume_pull_stream(response, model).await.map_err(upstream)?;

        if summary.is_success() {
            self.state.mark_known(model).await;
        } else {
            warn!(
                "pull of {model} ended with status {:?}; not marking it available",
                summary.final_status
            );
        }

        Ok(summary)
    }

    /// Load ("serve") a model after verifying it is available
    ///
    /// Membership is satisfied by the known set or by a live catalog query;
    /// the live result is authoritative for this check only and is not
    /// persisted. An unknown model fails with NotFound carrying the current
    /// catalog as a diagnostic, without touching the loaded map.
    pub async fn load_model(&self, model: &str) -> Result<LoadOutcome> {
        if !self.state.is_known(model).await {
            let available = match self.engine.list_models().await {
                Ok(entries) => entries.into_iter().map(|entry| entry.name).collect(),
                Err(e) => {
                    warn!("availability query failed during load of {model}: {e}");
                    Vec::new()
                }
            };

            if !available.iter().any(|name| name == model) {
                return Err(Error::ModelNotFound {
                    model: model.to_string(),
                    available,
                });
            }
        }

        info!("Loading model: {model}");
        self.test_load(model).await
    }

    /// Bulk startup: pull each default model in order, then load-test every
    /// model that ended up known. Partial failure is expected and non-fatal.
    pub async fn startup(&self, models: &[String]) -> StartupReport {
        let mut results = Vec::with_capacity(models.len());

        for model in models {
            let report = match self.pull_model(model).await {
                Ok(summary) if summary.is_success() => PullReport {
                    model: model.clone(),
                    status: "success".to_string(),
                    message: summary.last_status,
                },
                Ok(summary) => PullReport {
                    model: model.clone(),
                    status: "error".to_string(),
                    message: format!("pull ended without success: {}", summary.last_status),
                },
                Err(e) => {
                    warn!("Failed to pull {model}: {e}");
                    PullReport {
                        model: model.clone(),
                        status: "error".to_string(),
                        message: e.to_string(),
                    }
                }
            };
            results.push(report);
        }

        for model in models {
            if !self.state.is_known(model).await {
                continue;
            }
            info!("Testing model: {model}");
            match self.test_load(model).await {
                Ok(_) => info!("Model {model} tested successfully"),
                Err(e) => warn!("Failed to test {model}: {e}"),
            }
        }

        StartupReport {
            results,
            models_loaded: self.state.loaded_model_names(),
        }
    }

    /// Names in the engine's live catalog
    pub async fn list_available(&self) -> Result<Vec<String>> {
        let entries = self.engine.list_models().await.map_err(upstream)?;
        Ok(entries.into_iter().map(|entry| entry.name).collect())
    }

    /// Issue the short test generation that forces the engine to load the
    /// model, recording the load time on success.
    async fn test_load(&self, model: &str) -> Result<LoadOutcome> {
        let request = GenerateRequest::load_test(model);
        self.engine.generate(&request).await.map_err(upstream)?;

        let loaded_at = Utc::now();
        self.state.mark_loaded(model, loaded_at);
        info!("Model {model} loaded");

        Ok(LoadOutcome {
            model: model.to_string(),
            loaded_at,
        })
    }
}
