//! Mock chat backend for integration tests.
//!
//! Serves the `/ping`, `/chat`, `/chat/image` and `/chat/clear` contract on a
//! loopback port and records every request it sees. Replies are streamed
//! piece by piece so tests control how event lines are split across reads.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use chat_core::client::REQUEST_ID_HEADER;
use chat_core::protocol::{ChatRequest, PingResponse, SERVER_OK_STATUS};
use tokio::net::TcpListener;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Ping,
    Chat(ChatRequest),
    ChatImage {
        message: String,
        session_id: String,
        file_name: Option<String>,
        content_type: Option<String>,
        image_len: usize,
    },
    Clear(Option<String>),
}

/// What the backend streams back for a chat request.
#[derive(Clone)]
pub struct Script {
    pub status: StatusCode,
    pub pieces: Vec<String>,
    pub delay: Duration,
    /// When set, the stream pauses after `gate_after` pieces until notified.
    pub gate: Option<Arc<Notify>>,
    pub gate_after: usize,
}

impl Script {
    pub fn pieces(pieces: &[&str]) -> Self {
        Self {
            status: StatusCode::OK,
            pieces: pieces.iter().map(|p| p.to_string()).collect(),
            delay: Duration::from_millis(5),
            gate: None,
            gate_after: 0,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::pieces(&[])
        }
    }

    pub fn gated(mut self, after: usize, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self.gate_after = after;
        self
    }
}

/// Route and `x-request-id` value of every request, in arrival order.
type RequestIds = Arc<Mutex<Vec<(&'static str, Option<String>)>>>;

#[derive(Clone)]
struct MockState {
    script: Script,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    request_ids: RequestIds,
}

impl MockState {
    fn note_request(&self, route: &'static str, headers: &HeaderMap) {
        let id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.request_ids.lock().unwrap().push((route, id));
    }
}

pub struct MockBackend {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    request_ids: RequestIds,
}

impl MockBackend {
    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn request_ids(&self) -> Vec<(&'static str, Option<String>)> {
        self.request_ids.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> usize {
        self.recorded()
            .iter()
            .filter(|r| matches!(r, Recorded::Chat(_) | Recorded::ChatImage { .. }))
            .count()
    }
}

/// Start a backend on an ephemeral port.
pub async fn spawn_backend(script: Script) -> MockBackend {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let request_ids = RequestIds::default();
    let state = MockState {
        script,
        recorded: recorded.clone(),
        request_ids: request_ids.clone(),
    };

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/chat", post(chat))
        .route("/chat/image", post(chat_image))
        .route("/chat/clear", delete(clear))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        base_url: format!("http://{addr}"),
        recorded,
        request_ids,
    }
}

async fn ping(State(state): State<MockState>, headers: HeaderMap) -> Json<PingResponse> {
    state.note_request("/ping", &headers);
    state.recorded.lock().unwrap().push(Recorded::Ping);
    Json(PingResponse {
        status: SERVER_OK_STATUS.to_string(),
        vision_available: true,
    })
}

async fn chat(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Response {
    state.note_request("/chat", &headers);
    state.recorded.lock().unwrap().push(Recorded::Chat(req));
    stream_reply(&state.script)
}

async fn chat_image(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    state.note_request("/chat/image", &headers);
    let mut message = String::new();
    let mut session_id = String::new();
    let mut file_name = None;
    let mut content_type = None;
    let mut image_len = 0;

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "message" => message = field.text().await.unwrap(),
            "session_id" => session_id = field.text().await.unwrap(),
            "image" => {
                file_name = field.file_name().map(str::to_string);
                content_type = field.content_type().map(str::to_string);
                image_len = field.bytes().await.unwrap().len();
            }
            _ => {}
        }
    }

    state.recorded.lock().unwrap().push(Recorded::ChatImage {
        message,
        session_id,
        file_name,
        content_type,
        image_len,
    });
    stream_reply(&state.script)
}

async fn clear(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    state.note_request("/chat/clear", &headers);
    state
        .recorded
        .lock()
        .unwrap()
        .push(Recorded::Clear(params.get("session_id").cloned()));
    StatusCode::OK
}

fn stream_reply(script: &Script) -> Response {
    if !script.status.is_success() {
        return (script.status, "backend unavailable").into_response();
    }

    let script = script.clone();
    let body = async_stream::stream! {
        for (index, piece) in script.pieces.into_iter().enumerate() {
            if index == script.gate_after {
                if let Some(gate) = &script.gate {
                    gate.notified().await;
                }
            }
            tokio::time::sleep(script.delay).await;
            yield Ok::<_, std::convert::Infallible>(Bytes::from(piece));
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .body(Body::from_stream(body))
        .unwrap()
}

/// Poll `condition` until it holds or two seconds pass.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
