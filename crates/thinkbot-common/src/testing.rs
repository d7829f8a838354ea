//! In-process stand-in for an OpenAI-compatible chat-completions provider.
//!
//! Replies are replayed in order, one per `POST /chat/completions`. Once the
//! script runs out every further call gets a 500, which the gateway treats as
//! terminal, so tests fail loudly instead of hanging in retries.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use crate::gateway::GatewayConfig;

#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
}

impl MockReply {
    /// 200 with `content` wrapped in a `choices[0].message.content` envelope.
    pub fn content(content: impl Into<String>) -> Self {
        let body = json!({
            "choices": [{ "message": { "role": "assistant", "content": content.into() } }]
        });
        Self {
            status: 200,
            body: body.to_string(),
        }
    }

    /// A body sent verbatim, envelope or not.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct MockState {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockProvider {
    base_url: String,
    state: Arc<MockState>,
}

impl MockProvider {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = Arc::new(MockState {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/chat/completions", post(chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock provider");
        let addr = listener.local_addr().expect("mock provider address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock provider serve");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gateway settings pointed at this provider with millisecond backoff.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.base_url.clone(),
            default_timeout: Duration::from_secs(5),
            backoff_unit: Duration::from_millis(1),
            ..GatewayConfig::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.state.requests.lock().expect("requests lock").len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }
}

async fn chat_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest { authorization, body });

    let next = state.replies.lock().expect("replies lock").pop_front();
    match next {
        Some(reply) => {
            let status =
                StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, reply.body).into_response()
        }
        None => (StatusCode::INTERNAL_SERVER_ERROR, "mock provider script exhausted").into_response(),
    }
}
