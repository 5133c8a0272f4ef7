//! Per-session chat context.
//!
//! A [`ChatSession`] carries everything one conversation needs: the session
//! id sent to the backend, the in-flight guard, the cancellation handle of
//! the running exchange, the pending image, the voice-output toggle and the
//! local history. Independent sessions can live side by side in one process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::assembler::{StreamAssembler, StreamOutcome};
use crate::attachment::ImageAttachment;
use crate::client::ChatClient;
use crate::message::{MessageRecord, MessageView};

/// Why a send did not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyMessage,
    /// Another reply is still streaming for this session.
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(RejectReason),
    Finished(StreamOutcome),
}

impl SendOutcome {
    pub fn completed_text(&self) -> Option<&str> {
        match self {
            SendOutcome::Finished(outcome) => outcome.completed_text(),
            SendOutcome::Rejected(_) => None,
        }
    }
}

pub struct ChatSession {
    id: String,
    client: ChatClient,
    generating: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
    pending_image: Mutex<Option<ImageAttachment>>,
    voice_output: AtomicBool,
    history: Mutex<Vec<MessageRecord>>,
}

/// Releases the in-flight flag and drops the cancellation handle.
struct InFlightGuard<'a> {
    session: &'a ChatSession,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(&self.session.cancel).take();
        self.session.generating.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // The protected values stay consistent even if a holder panicked.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ChatSession {
    /// New session with a fresh `user_<millis>` id.
    pub fn new(client: ChatClient) -> Self {
        let id = format!("user_{}", Utc::now().timestamp_millis());
        Self::with_id(client, id)
    }

    pub fn with_id(client: ChatClient, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client,
            generating: AtomicBool::new(false),
            cancel: Mutex::new(None),
            pending_image: Mutex::new(None),
            voice_output: AtomicBool::new(false),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client(&self) -> &ChatClient {
        &self.client
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    pub fn attach_image(&self, image: ImageAttachment) {
        info!("Attached image {} ({} bytes)", image.file_name, image.len());
        *lock(&self.pending_image) = Some(image);
    }

    pub fn remove_image(&self) -> Option<ImageAttachment> {
        lock(&self.pending_image).take()
    }

    pub fn pending_image(&self) -> Option<ImageAttachment> {
        lock(&self.pending_image).clone()
    }

    pub fn voice_output(&self) -> bool {
        self.voice_output.load(Ordering::Relaxed)
    }

    pub fn set_voice_output(&self, enabled: bool) {
        self.voice_output.store(enabled, Ordering::Relaxed);
    }

    /// Flip voice output and return the new setting.
    pub fn toggle_voice_output(&self) -> bool {
        !self.voice_output.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn history(&self) -> Vec<MessageRecord> {
        lock(&self.history).clone()
    }

    fn try_begin(&self) -> Option<(InFlightGuard<'_>, CancellationToken)> {
        self.generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let token = CancellationToken::new();
        *lock(&self.cancel) = Some(token.clone());
        Some((InFlightGuard { session: self }, token))
    }

    /// Send a message and stream the reply into `view`.
    ///
    /// Empty input and sends while a reply is in flight are rejected without
    /// side effects. Otherwise the call returns once the reply reached a
    /// terminal state, the transport failed or the exchange was cancelled.
    pub async fn send(&self, text: &str, view: &mut dyn MessageView) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SendOutcome::Rejected(RejectReason::EmptyMessage);
        }
        let Some((_guard, cancel)) = self.try_begin() else {
            warn!("Send rejected: a reply is still in flight");
            return SendOutcome::Rejected(RejectReason::InFlight);
        };

        let image = self.remove_image();
        let user = MessageRecord::user(text, image.as_ref());
        view.render(&user);
        lock(&self.history).push(user);

        let placeholder = MessageRecord::assistant_placeholder();
        view.render(&placeholder);
        let mut assembler = StreamAssembler::new(placeholder, view);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.client.open_chat(&self.id, text, image.as_ref()) => Some(opened),
        };

        let (assistant, outcome) = match opened {
            None => {
                assembler.cancel();
                assembler.into_parts()
            }
            Some(Err(e)) => {
                error!("Chat request failed: {e}");
                assembler.fail_transport(&e);
                assembler.into_parts()
            }
            Some(Ok(stream)) => assembler.run(stream, &cancel).await,
        };

        lock(&self.history).push(assistant);
        SendOutcome::Finished(outcome)
    }

    /// Abort the running exchange, if any. Returns whether one was running.
    pub fn cancel_in_flight(&self) -> bool {
        match lock(&self.cancel).as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Clear the conversation locally and on the server.
    ///
    /// The server call is fire-and-forget: failures are logged only.
    pub async fn clear(&self) {
        if self.cancel_in_flight() {
            info!("Cancelled in-flight reply while clearing");
        }
        lock(&self.history).clear();
        self.remove_image();

        if let Err(e) = self.client.clear_session(&self.id).await {
            warn!("Failed to clear server-side session {}: {e}", self.id);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}
