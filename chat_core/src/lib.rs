//! Streaming chat client core.
//!
//! [`ChatSession::send`] posts a message to the backend, then hands the
//! streamed body to a [`StreamAssembler`], which frames `data: <json>` lines,
//! accumulates the reply and re-renders it into a [`MessageView`] after every
//! event: line breaks only while streaming, full markdown once `done` arrives.

pub mod assembler;
pub mod attachment;
pub mod client;
pub mod error;
pub mod framing;
pub mod message;
pub mod protocol;
pub mod render;
pub mod session;
pub mod status;

pub use assembler::{StreamAssembler, StreamOutcome};
pub use attachment::ImageAttachment;
pub use client::ChatClient;
pub use error::{ChatError, Result};
pub use message::{MessageRecord, MessageState, MessageView, Role};
pub use protocol::{PingResponse, StreamEvent, StreamRecord};
pub use session::{ChatSession, RejectReason, SendOutcome};
pub use status::ServerStatus;
