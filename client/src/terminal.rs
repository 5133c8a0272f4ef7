//! Plain-text rendering of chat messages.

use std::collections::HashMap;
use std::io::{self, Write};

use chat_core::{MessageRecord, MessageState, MessageView, Role};
use tracing::warn;
use uuid::Uuid;

/// Prints assistant replies as they stream in.
///
/// Only the part of the reply not yet printed is written on each render, so
/// the terminal shows a growing line rather than repeated snapshots.
pub struct TerminalView<W = io::Stdout> {
    out: W,
    printed: HashMap<Uuid, usize>,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: HashMap::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print a line of client output.
    pub fn notice(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {e}");
        }
    }

    pub fn prompt(&mut self) {
        if let Err(e) = write!(self.out, "> ").and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {e}");
        }
    }

    fn write_message(&mut self, message: &MessageRecord) -> io::Result<()> {
        // The user's own line is already on screen.
        if message.role == Role::User {
            return Ok(());
        }

        let printed = match self.printed.get(&message.id) {
            Some(printed) => *printed,
            None => {
                write!(self.out, "{} ", message.role.label())?;
                self.printed.insert(message.id, 0);
                0
            }
        };

        match message.state {
            MessageState::Pending => {}
            MessageState::Streaming | MessageState::Complete => {
                let delta = message.content.get(printed..).unwrap_or(&message.content);
                write!(self.out, "{delta}")?;
                self.printed.insert(message.id, message.content.len());
                if message.state == MessageState::Complete {
                    writeln!(self.out)?;
                    self.printed.remove(&message.id);
                }
            }
            MessageState::Failed => {
                if printed > 0 {
                    writeln!(self.out)?;
                }
                writeln!(
                    self.out,
                    "\u{274c} {}",
                    message.error.as_deref().unwrap_or("Request failed")
                )?;
                self.printed.remove(&message.id);
            }
        }
        self.out.flush()
    }
}

impl<W: Write + Send> MessageView for TerminalView<W> {
    fn render(&mut self, message: &MessageRecord) {
        if let Err(e) = self.write_message(message) {
            warn!("Failed to write to terminal: {e}");
        }
    }
}
