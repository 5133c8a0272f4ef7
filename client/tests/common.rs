//! Mock chat and TTS backends, plus a capturable terminal.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use speech_core::wav::encode_wav_base64;
use tokio::net::TcpListener;

/// Terminal output shared with the test.
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Seen {
    chat: Arc<Mutex<Vec<Value>>>,
    cleared: Arc<Mutex<Vec<String>>>,
    spoken: Arc<Mutex<Vec<String>>>,
}

pub struct MockServer {
    pub base_url: String,
    seen: Seen,
}

impl MockServer {
    pub fn chat_messages(&self) -> Vec<String> {
        self.seen
            .chat
            .lock()
            .unwrap()
            .iter()
            .filter_map(|body| body["message"].as_str().map(str::to_string))
            .collect()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.seen.cleared.lock().unwrap().clone()
    }

    pub fn spoken(&self) -> Vec<String> {
        self.seen.spoken.lock().unwrap().clone()
    }
}

/// One server answering both the chat and the TTS contract. Every chat
/// reply streams `reply` in two fragments.
pub async fn spawn_server() -> MockServer {
    let seen = Seen::default();

    let app = Router::new()
        .route("/ping", get(ping))
        .route("/chat", post(chat))
        .route("/chat/clear", delete(clear))
        .route("/voices/detail", get(voices))
        .route("/tts", post(tts))
        .with_state(seen.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockServer {
        base_url: format!("http://{addr}"),
        seen,
    }
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "server is working", "vision_available": false }))
}

async fn chat(State(seen): State<Seen>, Json(body): Json<Value>) -> Response {
    seen.chat.lock().unwrap().push(body);
    let lines = "data: {\"chunk\":\"Hello \"}\n\
                 data: {\"chunk\":\"**world**\"}\n\
                 data: {\"done\":true}\n";
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "text/event-stream")
        .body(Body::from(lines))
        .unwrap()
}

async fn clear(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
) -> StatusCode {
    if let Some(id) = params.get("session_id") {
        seen.cleared.lock().unwrap().push(id.clone());
    }
    StatusCode::OK
}

async fn voices() -> Json<Value> {
    Json(json!([
        { "key": "en_US", "config": "models/en_US/en_US-lessac-medium.onnx.json", "speaker": null }
    ]))
}

async fn tts(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    seen.spoken.lock().unwrap().push(text);
    Json(json!({
        "audio_base64": encode_wav_base64(&[0.0f32; 160], 16_000).unwrap(),
        "duration_ms": 10,
        "sample_rate": 16_000,
    }))
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
