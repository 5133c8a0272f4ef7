//! Chat message records and the view seam they are rendered into.

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::attachment::ImageAttachment;
use crate::render::{escape_html, render_markdown, render_streaming};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "You:",
            Role::Assistant => "AI:",
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "ai",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    /// Created, waiting for the first chunk.
    Pending,
    Streaming,
    Complete,
    Failed,
}

impl MessageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageState::Complete | MessageState::Failed)
    }
}

const TYPING_INDICATOR: &str =
    "<div class=\"typing-indicator\"><span></span><span></span><span></span></div>";
const CURSOR: &str = "<span class=\"cursor\">|</span>";

/// One message in the conversation.
///
/// `content` is the raw text; `html` is what a view should display. A record
/// in a terminal state is frozen.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub html: String,
    pub state: MessageState,
    /// Set once the message failed.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// A sent user message; complete from the start.
    pub fn user(text: &str, image: Option<&ImageAttachment>) -> Self {
        let mut html = format!("<b>{}</b> {}", Role::User.label(), escape_html(text));
        if let Some(image) = image {
            html.push_str(&format!(
                "<img src=\"{}\" alt=\"{}\" style=\"max-width: 200px; border-radius: 8px; margin-top: 8px\">",
                image.data_url(),
                escape_html(&image.file_name),
            ));
        }
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: text.to_string(),
            html,
            state: MessageState::Complete,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// An assistant message showing the typing indicator.
    pub fn assistant_placeholder() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            html: format!("<b>{}</b>{TYPING_INDICATOR}", Role::Assistant.label()),
            state: MessageState::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn frozen(&self, action: &str) -> bool {
        if self.state.is_terminal() {
            warn!(message_id = %self.id, "Ignoring {action} on a finished message");
            return true;
        }
        false
    }

    /// Show a partial reply with the cheap renderer. Returns false if frozen.
    pub fn show_partial(&mut self, text: &str) -> bool {
        if self.frozen("partial update") {
            return false;
        }
        self.content = text.to_string();
        self.html = format!(
            "<b>{}</b> {}{CURSOR}",
            self.role.label(),
            render_streaming(text)
        );
        self.state = MessageState::Streaming;
        true
    }

    /// Final markdown render; freezes the record.
    pub fn complete(&mut self, text: &str) -> bool {
        if self.frozen("completion") {
            return false;
        }
        self.content = text.to_string();
        self.html = format!(
            "<b>{}</b><div>{}</div>",
            self.role.label(),
            render_markdown(text)
        );
        self.state = MessageState::Complete;
        true
    }

    /// Replace the content with an error indicator; freezes the record.
    pub fn fail(&mut self, error: &str) -> bool {
        if self.frozen("failure") {
            return false;
        }
        self.html = format!(
            "<b>{}</b> <span class=\"error\">\u{274c} {}</span>",
            self.role.label(),
            escape_html(error)
        );
        self.state = MessageState::Failed;
        self.error = Some(error.to_string());
        true
    }

    /// The record wrapped in its role container, as it would sit in a page.
    pub fn to_html_block(&self) -> String {
        format!("<div class=\"{}\">{}</div>", self.role.css_class(), self.html)
    }
}

/// Where rendered messages are displayed.
///
/// `render` is called after every mutation of a record, with the record in
/// its new state. Implementations must not assume they see every chunk as a
/// separate call boundary for anything but display.
pub trait MessageView: Send {
    fn render(&mut self, message: &MessageRecord);
}

/// A view that drops everything; handy for headless use.
#[derive(Debug, Default)]
pub struct NullView;

impl MessageView for NullView {
    fn render(&mut self, _message: &MessageRecord) {}
}

/// A view that records every render, mainly for tests and transcripts.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub renders: Vec<MessageRecord>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent render of the message with the given id.
    pub fn latest(&self, id: Uuid) -> Option<&MessageRecord> {
        self.renders.iter().rev().find(|m| m.id == id)
    }

    pub fn last(&self) -> Option<&MessageRecord> {
        self.renders.last()
    }
}

impl MessageView for RecordingView {
    fn render(&mut self, message: &MessageRecord) {
        self.renders.push(message.clone());
    }
}
