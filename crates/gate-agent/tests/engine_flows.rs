//! End-to-end tests for the orchestration and HTTP surface against a mocked
//! inference engine.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use gate_agent::{server, AppState};
use gate_core::{GateConfig, GpuSnapshot};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn app_state(engine: &MockServer, defaults: &[&str]) -> AppState {
    let mut config = GateConfig::default()
        .with_token(TOKEN)
        .with_engine_url(&engine.uri())
        .unwrap();
    config.models.defaults = defaults.iter().map(|s| s.to_string()).collect();
    AppState::new(config).unwrap()
}

async fn call(
    state: &AppState,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = server::build_router(state.clone())
        .oneshot(request)
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn pull_stream(lines: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(lines.join("\n").into_bytes(), "application/x-ndjson")
}

async fn mount_successful_pull(engine: &MockServer, model: &str) {
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(json!({ "name": model })))
        .respond_with(pull_stream(&[
            r#"{"status":"pulling manifest"}"#,
            r#"{"status":"downloading","completed":500,"total":1000}"#,
            r#"{"status":"success"}"#,
        ]))
        .mount(engine)
        .await;
}

async fn mount_generate_ok(engine: &MockServer, model: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({ "model": model })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "ok", "done": true, "total_duration": 42
        })))
        .mount(engine)
        .await;
}

async fn mount_tags(engine: &MockServer, names: &[&str]) {
    let models: Vec<Value> = names
        .iter()
        .map(|name| json!({ "name": name, "size": 5_000_000_000u64 }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": models })))
        .mount(engine)
        .await;
}

#[tokio::test]
async fn unauthorized_infer_performs_no_upstream_call() {
    let engine = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&engine)
        .await;

    let state = app_state(&engine, &["qwen3:8b"]);

    // Missing token
    let (status, body) = call(
        &state,
        Method::POST,
        "/think",
        None,
        Some(json!({ "prompt": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    // Wrong token
    let (status, _) = call(
        &state,
        Method::POST,
        "/think",
        Some("wrong"),
        Some(json!({ "prompt": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn think_requires_prompt() {
    let engine = MockServer::start().await;
    let state = app_state(&engine, &["qwen3:8b"]);

    let (status, body) = call(
        &state,
        Method::POST,
        "/think",
        Some(TOKEN),
        Some(json!({ "model": "qwen3:8b" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("prompt"));
}

#[tokio::test]
async fn think_augments_engine_response() {
    let engine = MockServer::start().await;
    mount_generate_ok(&engine, "qwen3:8b").await;

    let state = app_state(&engine, &["qwen3:8b"]);
    state
        .state
        .publish_gpu(GpuSnapshot::new(77.0, 6000.0, 8000.0, 74.0))
        .await;

    // Model omitted: the configured default is used
    let (status, body) = call(
        &state,
        Method::POST,
        "/think",
        Some(TOKEN),
        Some(json!({ "prompt": "hello" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "qwen3:8b");
    assert_eq!(body["response"], "ok");
    assert_eq!(body["total_duration"], 42);
    assert_eq!(body["gpu_utilization"], 77.0);
    assert!(body["inference_time"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn pull_marks_model_known_and_is_idempotent() {
    let engine = MockServer::start().await;
    mount_successful_pull(&engine, "qwen3:8b").await;

    let state = app_state(&engine, &["qwen3:8b"]);

    let first = state.orchestrator.pull_model("qwen3:8b").await.unwrap();
    assert!(first.is_success());
    assert_eq!(first.last_status, "success");

    let second = state.orchestrator.pull_model("qwen3:8b").await.unwrap();
    assert!(second.is_success());

    // Pulling twice leaves exactly one known entry
    assert_eq!(state.state.known_models().await, vec!["qwen3:8b".to_string()]);
}

#[tokio::test]
async fn interrupted_pull_is_not_marked_available() {
    let engine = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .respond_with(pull_stream(&[
            r#"{"status":"downloading","completed":10,"total":1000}"#,
        ]))
        .mount(&engine)
        .await;

    let state = app_state(&engine, &["qwen3:8b"]);

    let (status, body) = call(
        &state,
        Method::POST,
        "/pull_model",
        Some(TOKEN),
        Some(json!({ "model": "qwen3:8b" })),
    )
    .await;

    // The stream completed but never reported success
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "downloading - 1.0%");
    assert!(!state.state.is_known("qwen3:8b").await);
}

#[tokio::test]
async fn pull_model_requires_model_field() {
    let engine = MockServer::start().await;
    let state = app_state(&engine, &[]);

    let (status, body) = call(
        &state,
        Method::POST,
        "/pull_model",
        Some(TOKEN),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("Missing 'model' in request body"));

    // Absent body entirely
    let (status, _) = call(&state, Method::POST, "/pull_model", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn serve_model_unknown_returns_not_found_without_mutation() {
    let engine = MockServer::start().await;
    mount_tags(&engine, &["llama3:8b"]).await;

    let state = app_state(&engine, &[]);

    let (status, body) = call(
        &state,
        Method::POST,
        "/serve_model",
        Some(TOKEN),
        Some(json!({ "model": "missing:1b" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing:1b"));
    assert_eq!(body["available_models"], json!(["llama3:8b"]));
    assert!(state.state.loaded_models().is_empty());
}

#[tokio::test]
async fn serve_model_in_live_catalog_loads() {
    let engine = MockServer::start().await;
    mount_tags(&engine, &["qwen3:8b"]).await;
    mount_generate_ok(&engine, "qwen3:8b").await;

    let state = app_state(&engine, &[]);

    let (status, body) = call(
        &state,
        Method::POST,
        "/serve_model",
        Some(TOKEN),
        Some(json!({ "model": "qwen3:8b" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Model qwen3:8b loaded");
    assert!(state.state.loaded_models().contains_key("qwen3:8b"));

    // The live catalog satisfied the check but is not persisted as known
    assert!(!state.state.is_known("qwen3:8b").await);
}

#[tokio::test]
async fn serve_model_engine_failure_is_upstream() {
    let engine = MockServer::start().await;
    mount_tags(&engine, &["qwen3:8b"]).await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model runner crashed"))
        .mount(&engine)
        .await;

    let state = app_state(&engine, &[]);

    let (status, body) = call(
        &state,
        Method::POST,
        "/serve_model",
        Some(TOKEN),
        Some(json!({ "model": "qwen3:8b" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("model runner crashed"));
    assert!(state.state.loaded_models().is_empty());
}

#[tokio::test]
async fn startup_partial_failure_records_both_outcomes() {
    let engine = MockServer::start().await;

    // Model A's pull fails outright
    Mock::given(method("POST"))
        .and(path("/api/pull"))
        .and(body_partial_json(json!({ "name": "model-a" })))
        .respond_with(ResponseTemplate::new(500).set_body_string("no such manifest"))
        .mount(&engine)
        .await;

    // Model B pulls and load-tests cleanly
    mount_successful_pull(&engine, "model-b").await;
    mount_generate_ok(&engine, "model-b").await;

    let state = app_state(&engine, &["model-a", "model-b"]);

    let (status, body) = call(&state, Method::POST, "/startup", Some(TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["model"], "model-a");
    assert_eq!(results[0]["status"], "error");
    assert_eq!(results[1]["model"], "model-b");
    assert_eq!(results[1]["status"], "success");

    // Only the model that pulled and tested cleanly is loaded
    assert_eq!(body["models_loaded"], json!(["model-b"]));
}

#[tokio::test]
async fn metrics_requires_no_auth_and_reports_consistent_snapshot() {
    let engine = MockServer::start().await;
    let state = app_state(&engine, &[]);
    state
        .state
        .publish_gpu(GpuSnapshot::new(55.0, 2048.0, 8192.0, 66.0))
        .await;

    let (status, body) = call(&state, Method::GET, "/metrics", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gpu"]["utilization"], 55.0);
    assert_eq!(body["gpu"]["memory_used_mb"], 2048.0);
    assert_eq!(body["gpu"]["memory_percent"], 25.0);
    assert!(body["system"]["cpu_percent"].is_number());
    assert!(body["models_loaded"].is_object());
}

#[tokio::test]
async fn health_reports_catalog_and_folds_known_set() {
    let engine = MockServer::start().await;
    mount_tags(&engine, &["qwen3:8b", "llama3:8b"]).await;

    let state = app_state(&engine, &["qwen3:8b"]);

    let (status, body) = call(&state, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["models_count"], 2);
    assert_eq!(body["default_model"], "qwen3:8b");

    let models = body["models_available"].as_array().unwrap();
    assert_eq!(models[0]["name"], "qwen3:8b");
    assert_eq!(models[0]["size"], "5.0GB");
    assert_eq!(models[0]["is_default"], true);
    assert_eq!(models[1]["is_default"], false);

    // Catalog entries become known without an explicit pull
    assert!(state.state.is_known("llama3:8b").await);
}

#[tokio::test]
async fn health_unreachable_engine_is_unhealthy() {
    // TEST-NET-1 address: nothing answers there, so the catalog call fails
    // deterministically on timeout
    let mut config = GateConfig::default()
        .with_token(TOKEN)
        .with_engine_url("http://192.0.2.1:11434")
        .unwrap();
    config.engine.request_timeout_seconds = 1;
    let state = AppState::new(config).unwrap();

    let (status, body) = call(&state, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "unhealthy");
    assert!(body["error"].is_string());
}
