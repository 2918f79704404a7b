//! Shared runtime state
//!
//! A single [`RuntimeState`] handle is created at startup and passed to the
//! telemetry sampler, the model orchestrator, and the metrics reporter. It is
//! cheap to clone; all clones observe the same underlying state. There are no
//! process-wide singletons, so tests can inject an isolated instance.

use crate::telemetry::GpuSnapshot;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Concurrency-safe store of the last-known GPU telemetry and the
/// known/loaded model bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Last successful GPU sample. Written only by the sampler, replaced
    /// wholesale under a single write lock so readers never see a torn
    /// snapshot.
    gpu: Arc<RwLock<GpuSnapshot>>,

    /// Model names confirmed present on the engine. Grows monotonically
    /// within a process run; entries are never removed.
    known_models: Arc<RwLock<HashSet<String>>>,

    /// Model name -> timestamp of the last successful load test.
    loaded_models: Arc<DashMap<String, DateTime<Utc>>>,
}

impl RuntimeState {
    /// Create an empty runtime state
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the GPU snapshot with a new sample (all fields at once)
    pub async fn publish_gpu(&self, snapshot: GpuSnapshot) {
        *self.gpu.write().await = snapshot;
    }

    /// Copy out the current GPU snapshot under one lock acquisition
    pub async fn gpu_snapshot(&self) -> GpuSnapshot {
        self.gpu.read().await.clone()
    }

    /// Record a model as confirmed present on the engine
    pub async fn mark_known(&self, model: impl Into<String>) {
        self.known_models.write().await.insert(model.into());
    }

    /// Whether a model has been confirmed present during this run
    pub async fn is_known(&self, model: &str) -> bool {
        self.known_models.read().await.contains(model)
    }

    /// Names of all models confirmed present, sorted for stable output
    pub async fn known_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.known_models.read().await.iter().cloned().collect();
        names.sort();
        names
    }

    /// Upsert the load timestamp for a model after a successful test call
    pub fn mark_loaded(&self, model: impl Into<String>, at: DateTime<Utc>) {
        self.loaded_models.insert(model.into(), at);
    }

    /// Copy of the loaded-model map, ordered by model name
    pub fn loaded_models(&self) -> BTreeMap<String, DateTime<Utc>> {
        self.loaded_models
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Names of models that passed a load test, sorted
    pub fn loaded_model_names(&self) -> Vec<String> {
        self.loaded_models().into_keys().collect()
    }
}
