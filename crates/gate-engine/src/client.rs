//! Inference engine HTTP client
//!
//! Thin reqwest wrapper over the engine's Ollama-compatible API. Catalog and
//! generate calls carry a bounded timeout; pull is long-running by nature and
//! carries none.

use crate::{EngineError, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Client for the local inference engine
#[derive(Debug, Clone)]
pub struct EngineClient {
    base_url: Url,
    client: Client,
    request_timeout: Duration,
}

/// One entry in the engine's model catalog
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Catalog response from `/api/tags`
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

/// Pull request body for `/api/pull`
#[derive(Debug, Serialize)]
struct PullRequest<'a> {
    name: &'a str,
}

/// Generation request for `/api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,
}

impl GenerateRequest {
    /// The short request used to force-load a model
    pub fn load_test(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: "test".to_string(),
            stream: false,
            options: serde_json::Value::Null,
        }
    }
}

/// Non-streaming generation response from `/api/generate`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default = "default_done")]
    pub done: bool,
    #[serde(default)]
    pub total_duration: u64,
}

fn default_done() -> bool {
    true
}

impl EngineClient {
    /// Create a client for the engine at `base_url`
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self> {
        // No client-wide timeout: pull streams may run for minutes. Bounded
        // calls apply the timeout per request.
        let client = Client::builder()
            .build()
            .map_err(|e| EngineError::Connection(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            client,
            request_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| EngineError::Connection(format!("invalid engine url: {e}")))
    }

    /// List the engine's model catalog via `GET /api/tags`
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let url = self.endpoint("/api/tags")?;
        debug!("fetching engine catalog from {url}");

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| EngineError::Connection(format!("catalog request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::upstream(status, text));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("invalid catalog response: {e}")))?;

        Ok(tags.models)
    }

    /// Start a streaming model pull via `POST /api/pull`
    ///
    /// Returns the raw response; feed it to
    /// [`crate::progress::consume_pull_stream`] to drive the newline-delimited
    /// status protocol to completion.
    pub async fn pull(&self, model: &str) -> Result<Response> {
        let url = self.endpoint("/api/pull")?;
        debug!("starting pull of {model} via {url}");

        let response = self
            .client
            .post(url)
            .json(&PullRequest { name: model })
            .send()
            .await
            .map_err(|e| EngineError::Connection(format!("pull request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::upstream(status, text));
        }

        Ok(response)
    }

    /// Run a non-streaming generation via `POST /api/generate`
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.endpoint("/api/generate")?;
        debug!(model = %request.model, "sending generate request");

        let response = self
            .client
            .post(url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| EngineError::Connection(format!("generate request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::upstream(status, text));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| EngineError::InvalidResponse(format!("invalid generate response: {e}")))?;

        Ok(generated)
    }
}
