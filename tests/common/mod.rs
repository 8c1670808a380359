//! In-process stand-in for the Azure OpenAI chat-completions service.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::Router;

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path and query string.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|v| v.to_str().expect("header is ASCII").to_string())
    }
}

struct StubState {
    status: StatusCode,
    body: String,
    delay: Duration,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct StubServer {
    addr: SocketAddr,
    state: Arc<StubState>,
}

impl StubServer {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_with_delay(status, body, Duration::ZERO).await
    }

    pub async fn start_with_delay(status: u16, body: impl Into<String>, delay: Duration) -> Self {
        let state = Arc::new(StubState {
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.into(),
            delay,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub server");
        let addr = listener.local_addr().expect("stub address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stub server");
        });

        Self { addr, state }
    }

    /// Base URL to use as the client endpoint.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        uri: uri.to_string(),
        headers,
        body: body.to_vec(),
    });
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body.clone())
}

pub const HELLO_REPLY: &str =
    r#"{"choices":[{"message":{"role":"assistant","content":"Hello, Eino!"}}]}"#;
