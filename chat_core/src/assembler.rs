//! Assembly of a streamed reply into a rendered assistant message.
//!
//! The assembler owns the response buffer and the assistant record for the
//! lifetime of one exchange. Events are applied strictly in arrival order;
//! once a terminal event has been applied nothing else is read or rendered.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::framing::{parse_line, LineFramer};
use crate::message::{MessageRecord, MessageView};
use crate::protocol::StreamEvent;

const TRANSPORT_ERROR_TEXT: &str = "Backend error. Make sure the server is running.";
const CANCELLED_TEXT: &str = "Response cancelled.";

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// `done` was received; carries the complete reply text.
    Completed { text: String },
    /// The server sent an `error` record.
    ServerError(String),
    /// The connection failed or the status was not a success.
    TransportFailed(String),
    /// End-of-data arrived before any terminal record.
    Truncated { text: String },
    /// The exchange was cancelled locally.
    Cancelled,
}

impl StreamOutcome {
    /// The complete reply, when the server finished normally.
    pub fn completed_text(&self) -> Option<&str> {
        match self {
            StreamOutcome::Completed { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

/// Append-only accumulation of reply fragments.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    text: String,
    fragments: usize,
}

impl ResponseBuffer {
    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

pub struct StreamAssembler<'v> {
    framer: LineFramer,
    buffer: ResponseBuffer,
    message: MessageRecord,
    view: &'v mut dyn MessageView,
    outcome: Option<StreamOutcome>,
    skipped: usize,
}

impl<'v> StreamAssembler<'v> {
    pub fn new(message: MessageRecord, view: &'v mut dyn MessageView) -> Self {
        Self {
            framer: LineFramer::new(),
            buffer: ResponseBuffer::default(),
            message,
            view,
            outcome: None,
            skipped: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }

    pub fn message(&self) -> &MessageRecord {
        &self.message
    }

    /// Number of marked lines that could not be parsed.
    pub fn skipped_records(&self) -> usize {
        self.skipped
    }

    /// Feed one transport read.
    pub fn feed(&mut self, bytes: &[u8]) -> Flow {
        if self.is_finished() {
            return Flow::Finished;
        }
        for line in self.framer.push(bytes) {
            if self.process_line(&line) == Flow::Finished {
                return Flow::Finished;
            }
        }
        Flow::Continue
    }

    fn process_line(&mut self, line: &str) -> Flow {
        match parse_line(line) {
            None => {
                trace!("Ignoring unmarked line: {line:?}");
                Flow::Continue
            }
            Some(Err(e)) => {
                warn!("Skipping stream record: {e}");
                self.skipped += 1;
                Flow::Continue
            }
            Some(Ok(record)) => {
                for event in record.into_events() {
                    if self.apply(event) == Flow::Finished {
                        return Flow::Finished;
                    }
                }
                Flow::Continue
            }
        }
    }

    /// Apply one event to the buffer and the message.
    pub fn apply(&mut self, event: StreamEvent) -> Flow {
        if self.is_finished() {
            return Flow::Finished;
        }
        match event {
            StreamEvent::Chunk(fragment) => {
                self.buffer.push(&fragment);
                self.message.show_partial(self.buffer.as_str());
                self.view.render(&self.message);
                Flow::Continue
            }
            StreamEvent::Error(error) => {
                warn!("Server reported an error: {error}");
                self.message.fail(&error);
                self.view.render(&self.message);
                self.outcome = Some(StreamOutcome::ServerError(error));
                Flow::Finished
            }
            StreamEvent::Done => {
                self.message.complete(self.buffer.as_str());
                self.view.render(&self.message);
                info!(
                    "Response complete: {} fragments, {} bytes",
                    self.buffer.fragments(),
                    self.buffer.as_str().len()
                );
                self.outcome = Some(StreamOutcome::Completed {
                    text: self.buffer.as_str().to_string(),
                });
                Flow::Finished
            }
        }
    }

    /// Handle end-of-data from the transport.
    pub fn finish_input(&mut self) {
        if let Some(line) = self.framer.finish() {
            if self.is_finished() {
                return;
            }
            self.process_line(&line);
        }
        if self.is_finished() {
            return;
        }
        warn!("Stream ended without a terminal record");
        self.message.complete(self.buffer.as_str());
        self.view.render(&self.message);
        self.outcome = Some(StreamOutcome::Truncated {
            text: self.buffer.as_str().to_string(),
        });
    }

    /// Terminal render for a failed transport.
    pub fn fail_transport(&mut self, error: impl Display) {
        if self.is_finished() {
            return;
        }
        warn!("Transport failed mid-stream: {error}");
        self.message.fail(TRANSPORT_ERROR_TEXT);
        self.view.render(&self.message);
        self.outcome = Some(StreamOutcome::TransportFailed(error.to_string()));
    }

    pub fn cancel(&mut self) {
        if self.is_finished() {
            return;
        }
        debug!("Cancelling in-flight response");
        self.message.fail(CANCELLED_TEXT);
        self.view.render(&self.message);
        self.outcome = Some(StreamOutcome::Cancelled);
    }

    pub fn into_parts(self) -> (MessageRecord, StreamOutcome) {
        let outcome = self.outcome.unwrap_or(StreamOutcome::Truncated {
            text: self.buffer.into_string(),
        });
        (self.message, outcome)
    }

    /// Drive the assembler from a transport byte stream until a terminal
    /// state, end-of-data, a read error or cancellation.
    pub async fn run<S, B, E>(
        mut self,
        stream: S,
        cancel: &CancellationToken,
    ) -> (MessageRecord, StreamOutcome)
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        futures::pin_mut!(stream);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancel();
                    break;
                }
                next = stream.next() => match next {
                    Some(Ok(bytes)) => {
                        if self.feed(bytes.as_ref()) == Flow::Finished {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        self.fail_transport(e);
                        break;
                    }
                    None => {
                        self.finish_input();
                        break;
                    }
                },
            }
        }
        self.into_parts()
    }
}
