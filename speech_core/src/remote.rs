//! A [`SpeechEngine`] backed by a TTS HTTP server.
//!
//! Voices come from `GET /voices/detail`; synthesis is `POST /tts`, which
//! answers with a Base64 WAV clip. Clips are written to an output directory
//! for playback.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SpeechError};
use crate::synth::{SpeechEngine, Utterance};
use crate::voice::VoiceInfo;
use crate::wav::decode_wav_base64;

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TtsResponse {
    pub audio_base64: String,
    pub duration_ms: u64,
    pub sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct VoiceDetail {
    key: String,
    config: String,
}

impl From<VoiceDetail> for VoiceInfo {
    fn from(detail: VoiceDetail) -> Self {
        // "models/en_US/en_US-lessac-medium.onnx.json" -> "en_US-lessac-medium"
        let file = Path::new(&detail.config)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| detail.config.clone());
        let name = file
            .split('.')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or(&file)
            .to_string();
        VoiceInfo::new(name, detail.key)
    }
}

pub struct RemoteTts {
    base_url: String,
    http: Client,
    output_dir: PathBuf,
    default_language: Option<String>,
}

impl RemoteTts {
    pub fn new(base_url: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
            output_dir: output_dir.into(),
            default_language: None,
        }
    }

    /// Language used when the utterance carries no voice.
    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = Some(language.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Synthesize `text` and return the server's response.
    pub async fn synthesize(&self, text: &str, language: Option<&str>) -> Result<TtsResponse> {
        let response = self
            .http
            .post(format!("{}/tts", self.base_url))
            .json(&TtsRequest {
                text,
                language,
                speaker: None,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status(status.as_u16()));
        }
        Ok(response.json::<TtsResponse>().await?)
    }
}

#[async_trait]
impl SpeechEngine for RemoteTts {
    async fn voices(&self) -> Result<Vec<VoiceInfo>> {
        let response = self
            .http
            .get(format!("{}/voices/detail", self.base_url))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::Status(status.as_u16()));
        }
        let details: Vec<VoiceDetail> = response.json().await?;
        Ok(details.into_iter().map(VoiceInfo::from).collect())
    }

    async fn speak(&self, utterance: Utterance) -> Result<()> {
        if utterance.rate != 1.0 || utterance.pitch != 1.0 || utterance.volume != 1.0 {
            debug!("TTS server ignores rate, pitch and volume");
        }
        let language = utterance
            .voice
            .as_ref()
            .map(|v| v.lang.as_str())
            .or(self.default_language.as_deref());

        let reply = self.synthesize(&utterance.text, language).await?;
        let (bytes, clip) = decode_wav_base64(&reply.audio_base64)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self
            .output_dir
            .join(format!("speech-{}.wav", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &bytes).await?;
        info!(
            "Synthesized {} ms of speech at {} Hz to {}",
            clip.duration_ms(),
            clip.sample_rate,
            path.display()
        );
        Ok(())
    }
}
