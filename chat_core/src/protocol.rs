//! Wire types shared with the chat backend.
//!
//! The streamed body of `/chat` and `/chat/image` is a sequence of
//! newline-terminated lines. Lines starting with [`EVENT_MARKER`] carry one
//! JSON [`StreamRecord`]; every other line is ignored.

use serde::{Deserialize, Serialize};

/// Prefix that marks a line as an event record.
pub const EVENT_MARKER: &str = "data: ";

/// Status string the backend reports when its model is reachable.
pub const SERVER_OK_STATUS: &str = "server is working";

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
}

/// Body of `GET /ping`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PingResponse {
    pub status: String,
    #[serde(default)]
    pub vision_available: bool,
}

/// One streamed record. At most one field is expected to be meaningful.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StreamRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub done: bool,
}

/// A single semantic event derived from a [`StreamRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    Error(String),
    Done,
}

impl StreamRecord {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            chunk: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    /// Expand the record into events in evaluation order.
    ///
    /// A non-empty `error` wins over the other fields. Empty strings carry no
    /// meaning and are dropped.
    pub fn into_events(self) -> Vec<StreamEvent> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return vec![StreamEvent::Error(error)];
        }

        let mut events = Vec::with_capacity(2);
        if let Some(chunk) = self.chunk.filter(|c| !c.is_empty()) {
            events.push(StreamEvent::Chunk(chunk));
        }
        if self.done {
            events.push(StreamEvent::Done);
        }
        events
    }

    /// Serialize as one framed line, as the backend would emit it.
    pub fn to_line(&self) -> String {
        // Serializing a plain struct of strings and a bool cannot fail.
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("{EVENT_MARKER}{json}\n")
    }
}
