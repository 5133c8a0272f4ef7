//! Mock TTS server for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use speech_core::wav::encode_wav_base64;
use tokio::net::TcpListener;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeenTts {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Clone, Default)]
struct TtsState {
    seen: Arc<Mutex<Vec<SeenTts>>>,
    fail: bool,
}

pub struct MockTts {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenTts>>>,
}

impl MockTts {
    pub fn seen(&self) -> Vec<SeenTts> {
        self.seen.lock().unwrap().clone()
    }
}

pub async fn spawn_tts(fail: bool) -> MockTts {
    let state = TtsState {
        fail,
        ..TtsState::default()
    };
    let seen = state.seen.clone();

    let app = Router::new()
        .route("/voices/detail", get(voices_detail))
        .route("/tts", post(tts))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockTts {
        base_url: format!("http://{addr}"),
        seen,
    }
}

async fn voices_detail() -> Json<Value> {
    Json(json!([
        { "key": "de_DE", "config": "models/de_DE/de_DE-thorsten-medium.onnx.json", "speaker": null },
        { "key": "en_US", "config": "models/en_US/en_US-lessac-medium.onnx.json", "speaker": null }
    ]))
}

async fn tts(
    State(state): State<TtsState>,
    Json(req): Json<SeenTts>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state.seen.lock().unwrap().push(req);
    if state.fail {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "TTS error", "code": 500 })),
        ));
    }

    let sample_rate = 22_050;
    let samples = vec![0.25f32; sample_rate as usize / 2];
    Ok(Json(json!({
        "audio_base64": encode_wav_base64(&samples, sample_rate).unwrap(),
        "duration_ms": 500,
        "sample_rate": sample_rate,
    })))
}
