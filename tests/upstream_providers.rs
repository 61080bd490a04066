use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use nips_chat::core::config::{ProviderKind, UpstreamConfig};
use nips_chat::core::errors::ApiError;
use nips_chat::llm::{
    build_provider, EmbeddingProvider, GenerationParams, LlmProvider, OpenAiProvider,
    ReplicateProvider,
};

async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn params(model: &str, timeout: Duration) -> GenerationParams {
    GenerationParams {
        model: model.to_string(),
        max_tokens: 64,
        temperature: None,
        timeout,
    }
}

#[tokio::test]
async fn openai_chat_completion_returns_trimmed_content() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["messages"][0]["role"], "user");
            Json(json!({
                "choices": [{ "message": { "content": format!("  echo: {}  ", body["model"].as_str().unwrap_or_default()) } }]
            }))
        }),
    );
    let base = spawn_stub(app).await;

    let provider =
        OpenAiProvider::new(base, Some("sk-test".into()), params("gpt-test", Duration::from_secs(5)))
            .unwrap();
    assert_eq!(provider.generate("hello").await.unwrap(), "echo: gpt-test");
}

#[tokio::test]
async fn openai_error_status_is_upstream_unavailable() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let base = spawn_stub(app).await;

    let provider =
        OpenAiProvider::new(base, None, params("gpt-test", Duration::from_secs(5))).unwrap();
    let err = provider.generate("hello").await.unwrap_err();
    assert!(matches!(err, ApiError::UpstreamUnavailable(ref m) if m.contains("429")));
}

#[tokio::test]
async fn openai_embeddings_keep_input_order() {
    let app = Router::new().route(
        "/v1/embeddings",
        post(|Json(body): Json<Value>| async move {
            let data: Vec<Value> = body["input"]
                .as_array()
                .map(|inputs| {
                    inputs
                        .iter()
                        .map(|i| json!({ "embedding": [i.as_str().map(str::len).unwrap_or(0) as f64, 1.0] }))
                        .collect()
                })
                .unwrap_or_default();
            Json(json!({ "data": data }))
        }),
    );
    let base = spawn_stub(app).await;

    let provider =
        OpenAiProvider::new(base, None, params("embed-test", Duration::from_secs(5))).unwrap();
    let vectors = provider
        .embed(&["a".to_string(), "abc".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 1.0], vec![3.0, 1.0]]);
}

#[derive(Clone, Default)]
struct PollState {
    polls: Arc<AtomicUsize>,
    base: Arc<std::sync::OnceLock<String>>,
}

#[tokio::test]
async fn replicate_polls_until_prediction_succeeds() {
    let state = PollState::default();
    let app = Router::new()
        .route(
            "/v1/models/acme/chat/predictions",
            post(|State(state): State<PollState>| async move {
                let base = state.base.get().cloned().unwrap_or_default();
                Json(json!({
                    "status": "starting",
                    "urls": { "get": format!("{}/v1/predictions/p1", base) }
                }))
            }),
        )
        .route(
            "/v1/predictions/p1",
            get(|State(state): State<PollState>| async move {
                let n = state.polls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    let base = state.base.get().cloned().unwrap_or_default();
                    Json(json!({
                        "status": "processing",
                        "urls": { "get": format!("{}/v1/predictions/p1", base) }
                    }))
                } else {
                    Json(json!({ "status": "succeeded", "output": ["Nostr ", "relays"] }))
                }
            }),
        )
        .with_state(state.clone());
    let base = spawn_stub(app).await;
    state.base.set(base.clone()).unwrap();

    let provider =
        ReplicateProvider::new(base, "r8_test".into(), params("acme/chat", Duration::from_secs(10)))
            .unwrap();
    assert_eq!(provider.generate("q").await.unwrap(), "Nostr relays");
    assert_eq!(state.polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn replicate_failed_prediction_is_upstream_unavailable() {
    let app = Router::new().route(
        "/v1/models/acme/chat/predictions",
        post(|| async { Json(json!({ "status": "failed", "error": "CUDA out of memory" })) }),
    );
    let base = spawn_stub(app).await;

    let provider =
        ReplicateProvider::new(base, "r8_test".into(), params("acme/chat", Duration::from_secs(5)))
            .unwrap();
    let err = provider.generate("q").await.unwrap_err();
    assert_eq!(err.to_string(), "upstream unavailable: CUDA out of memory");
}

#[test]
fn factory_selects_configured_provider() {
    let mut config = UpstreamConfig::default();
    let replicate = build_provider(&config, "token".into()).unwrap();
    assert_eq!(replicate.name(), "replicate");

    config.provider = ProviderKind::Openai;
    config.base_url = Some("http://localhost:1234".into());
    let openai = build_provider(&config, "token".into()).unwrap();
    assert_eq!(openai.name(), "openai");
}
