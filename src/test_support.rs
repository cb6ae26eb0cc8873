//! In-process fake of an OpenAI-compatible API for tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::models::{DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, LlmConfig};

/// Accepted by every endpoint.
pub(crate) const VALID_KEY: &str = "sk-valid";
/// Rejected with 403 instead of 401.
pub(crate) const FORBIDDEN_KEY: &str = "sk-forbidden";

pub(crate) const EMBEDDING_DIM: usize = 26;

#[derive(Default)]
struct FakeState {
    embedding_calls: AtomicUsize,
    chat_requests: Mutex<Vec<Value>>,
}

pub(crate) struct FakeApi {
    addr: SocketAddr,
    state: Arc<FakeState>,
}

impl FakeApi {
    pub(crate) async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/v1/embeddings", post(embeddings))
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub(crate) fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.base_url(),
            api_key: Some(VALID_KEY.to_string()),
            timeout_secs: 10,
        }
    }

    pub(crate) fn embedding_calls(&self) -> usize {
        self.state.embedding_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn chat_requests(&self) -> Vec<Value> {
        self.state.chat_requests.lock().unwrap().clone()
    }
}

/// Deterministic embedding: normalized histogram of ASCII letters.
pub(crate) fn letter_histogram(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for c in text.chars().filter(char::is_ascii_alphabetic) {
        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": {"message": message}}))).into_response()
}

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();
    match token {
        VALID_KEY => Ok(()),
        FORBIDDEN_KEY => Err(api_error(StatusCode::FORBIDDEN, "key is not allowed")),
        _ => Err(api_error(
            StatusCode::UNAUTHORIZED,
            "Incorrect API key provided",
        )),
    }
}

async fn embeddings(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    if body["model"] != DEFAULT_EMBEDDING_MODEL {
        return api_error(StatusCode::NOT_FOUND, "model not found");
    }
    state.embedding_calls.fetch_add(1, Ordering::SeqCst);

    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    // Reverse order so clients must sort by index.
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .rev()
        .map(|(index, text)| {
            json!({
                "object": "embedding",
                "index": index,
                "embedding": letter_histogram(text.as_str().unwrap_or_default()),
            })
        })
        .collect();

    Json(json!({"object": "list", "data": data, "model": DEFAULT_EMBEDDING_MODEL})).into_response()
}

async fn chat_completions(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(resp) = authorize(&headers) {
        return resp;
    }
    if body["model"] != DEFAULT_CHAT_MODEL {
        return api_error(StatusCode::NOT_FOUND, "model not found");
    }
    state.chat_requests.lock().unwrap().push(body.clone());

    let question = body["messages"]
        .as_array()
        .and_then(|messages| messages.iter().rev().find(|m| m["role"] == "user"))
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default();

    Json(json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": format!("answer to: {question}")},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}
