//! Voice input.
//!
//! A speech recognizer is modelled as a [`RecognitionSource`] that is
//! started, yields [`RecognitionEvent`]s and may end on its own.
//! [`VoiceInput::listen`] turns it into a cancellable stream of transcript
//! updates, restarting the source when it ends while still listening.

use async_trait::async_trait;
use futures_core::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Result, SpeechError};

pub const VOICE_INPUT_UNSUPPORTED: &str =
    "Voice input is not supported on this system. Type your message instead.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_result(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Results of the current session; only `results[result_index..]` changed.
    Results {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error(String),
    /// The engine stopped by itself.
    End,
}

/// Text recognized by one result batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptUpdate {
    /// Finalized text to append to the input, each piece followed by a space.
    pub final_text: String,
    /// Provisional text to show until it is finalized.
    pub interim: String,
}

impl TranscriptUpdate {
    pub fn from_results(result_index: usize, results: &[RecognitionResult]) -> Self {
        let mut update = Self::default();
        for result in results.iter().skip(result_index) {
            if result.is_final {
                update.final_text.push_str(&result.transcript);
                update.final_text.push(' ');
            } else {
                update.interim.push_str(&result.transcript);
            }
        }
        update
    }

    pub fn is_empty(&self) -> bool {
        self.final_text.is_empty() && self.interim.is_empty()
    }
}

#[async_trait]
pub trait RecognitionSource: Send {
    async fn start(&mut self) -> Result<()>;

    /// Next event, or `None` once the source can produce no more.
    async fn next_event(&mut self) -> Option<RecognitionEvent>;

    fn stop(&mut self);
}

/// A recognition source fed through a channel by the host application.
pub struct ChannelSource {
    events: mpsc::Receiver<RecognitionEvent>,
    active: bool,
    starts: usize,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<RecognitionEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            tx,
            Self {
                events: rx,
                active: false,
                starts: 0,
            },
        )
    }

    /// How many times the source has been started.
    pub fn starts(&self) -> usize {
        self.starts
    }
}

#[async_trait]
impl RecognitionSource for ChannelSource {
    async fn start(&mut self) -> Result<()> {
        self.active = true;
        self.starts += 1;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<RecognitionEvent> {
        if !self.active {
            return None;
        }
        self.events.recv().await
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

pub struct VoiceInput<S> {
    source: Option<S>,
}

impl<S: RecognitionSource> VoiceInput<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
        }
    }

    pub fn unsupported() -> Self {
        Self { source: None }
    }

    pub fn is_supported(&self) -> bool {
        self.source.is_some()
    }

    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// Listen until `token` is cancelled, the source fails or runs dry.
    pub fn listen(
        &mut self,
        token: CancellationToken,
    ) -> Result<impl Stream<Item = TranscriptUpdate> + Send + '_> {
        let source = self
            .source
            .as_mut()
            .ok_or(SpeechError::Unsupported(VOICE_INPUT_UNSUPPORTED))?;

        Ok(async_stream::stream! {
            if let Err(e) = source.start().await {
                warn!("Failed to start recognition: {e}");
                return;
            }
            loop {
                let next = tokio::select! {
                    biased;
                    _ = token.cancelled() => None,
                    event = source.next_event() => Some(event),
                };
                let Some(event) = next else {
                    source.stop();
                    break;
                };
                match event {
                    None => break,
                    Some(RecognitionEvent::Results { result_index, results }) => {
                        let update = TranscriptUpdate::from_results(result_index, &results);
                        if !update.is_empty() {
                            yield update;
                        }
                    }
                    Some(RecognitionEvent::Error(e)) => {
                        warn!("Speech recognition error: {e}");
                        source.stop();
                        break;
                    }
                    Some(RecognitionEvent::End) => {
                        if token.is_cancelled() {
                            break;
                        }
                        debug!("Recognition ended while listening, restarting");
                        if let Err(e) = source.start().await {
                            warn!("Failed to restart recognition: {e}");
                            break;
                        }
                    }
                }
            }
        })
    }
}
