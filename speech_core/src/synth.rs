//! Speech output.
//!
//! [`Speaker`] owns the voice-output toggle and at most one running
//! utterance. Starting a new utterance or disabling output cancels the
//! previous one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::clean::clean_text_for_speech;
use crate::error::{Result, SpeechError};
use crate::voice::{choose_voice, VoiceInfo};

pub const VOICE_OUTPUT_UNSUPPORTED: &str =
    "Voice output is not available: no speech engine is configured.";

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub voice: Option<VoiceInfo>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

/// Something that can turn text into sound.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn voices(&self) -> Result<Vec<VoiceInfo>>;

    /// Speak one utterance, returning when it has finished.
    async fn speak(&self, utterance: Utterance) -> Result<()>;
}

struct Playback {
    token: CancellationToken,
    task: JoinHandle<()>,
}

pub struct Speaker {
    engine: Option<Arc<dyn SpeechEngine>>,
    enabled: AtomicBool,
    voices: OnceCell<Vec<VoiceInfo>>,
    language: Option<String>,
    current: Mutex<Option<Playback>>,
}

impl Speaker {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine: Some(engine),
            enabled: AtomicBool::new(false),
            voices: OnceCell::new(),
            language: None,
            current: Mutex::new(None),
        }
    }

    /// A speaker for a system without speech output.
    pub fn unsupported() -> Self {
        Self {
            engine: None,
            enabled: AtomicBool::new(false),
            voices: OnceCell::new(),
            language: None,
            current: Mutex::new(None),
        }
    }

    /// Prefer voices for `language` over the English default.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn is_supported(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Turn voice output on or off. Turning it off stops ongoing speech.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        if enabled && !self.is_supported() {
            return Err(SpeechError::Unsupported(VOICE_OUTPUT_UNSUPPORTED));
        }
        self.enabled.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.cancel();
        }
        info!("Voice output {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Stop the current utterance, if any.
    pub fn cancel(&self) {
        let playback = self.lock_current().take();
        if let Some(playback) = playback {
            playback.token.cancel();
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<Playback>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn voice(&self, engine: &Arc<dyn SpeechEngine>) -> Option<VoiceInfo> {
        match self.voices.get_or_try_init(|| engine.voices()).await {
            Ok(voices) => choose_voice(voices, self.language.as_deref()).cloned(),
            Err(e) => {
                warn!("Could not list voices: {e}");
                None
            }
        }
    }

    /// Speak a completed reply in the background.
    ///
    /// Returns false without doing anything when output is disabled or the
    /// cleaned text is empty.
    pub async fn speak(&self, text: &str) -> bool {
        let Some(engine) = self.engine.clone() else {
            return false;
        };
        if !self.is_enabled() {
            return false;
        }
        self.cancel();

        let cleaned = clean_text_for_speech(text);
        if cleaned.is_empty() {
            debug!("Nothing to speak after cleaning");
            return false;
        }

        let mut utterance = Utterance::new(cleaned);
        utterance.voice = self.voice(&engine).await;

        let token = CancellationToken::new();
        let child = token.clone();
        let task = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => debug!("Speech cancelled"),
                result = engine.speak(utterance) => {
                    if let Err(e) = result {
                        warn!("Speech synthesis failed: {e}");
                    }
                }
            }
        });

        if let Some(previous) = self.lock_current().replace(Playback { token, task }) {
            previous.token.cancel();
        }
        true
    }

    /// Wait for the current utterance to end.
    pub async fn wait(&self) {
        let playback = self.lock_current().take();
        if let Some(playback) = playback {
            let _ = playback.task.await;
        }
    }
}
