//! Line framing for the streamed chat body.
//!
//! Transport reads arrive as arbitrary byte slices. [`LineFramer`] keeps the
//! bytes of an unfinished line (including half of a multi-byte UTF-8
//! sequence) until the terminating `\n` shows up in a later read.

use crate::error::{ChatError, Result};
use crate::protocol::{StreamRecord, EVENT_MARKER};

#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transport read and return every line it completed, in order.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            lines.push(decode_line(&self.pending[start..end]));
            start = end + 1;
        }
        self.pending.drain(..start);
        lines
    }

    /// Flush the unterminated trailing line at end-of-data, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&self.pending);
        self.pending.clear();
        Some(line)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse one framed line.
///
/// Returns `None` for lines without the event marker. A marked line whose
/// payload is not a valid record yields [`ChatError::MalformedRecord`].
pub fn parse_line(line: &str) -> Option<Result<StreamRecord>> {
    let payload = line.strip_prefix(EVENT_MARKER)?;
    Some(
        serde_json::from_str(payload).map_err(|source| ChatError::MalformedRecord {
            line: line.to_string(),
            source,
        }),
    )
}
