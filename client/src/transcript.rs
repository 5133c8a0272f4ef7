//! HTML transcript of a conversation.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chat_core::{MessageRecord, MessageView};
use tracing::{info, warn};
use uuid::Uuid;

const HEADER: &str = "<!DOCTYPE html>
<html>
<head>
<meta charset=\"utf-8\">
<title>Chat transcript</title>
<style>
.user { margin: 8px 0; }
.ai { margin: 8px 0; }
.error { color: #c0392b; }
pre code { display: block; padding: 8px; background: #f6f8fa; }
</style>
</head>
<body>
";

/// Appends each message to an HTML file once it is final.
pub struct TranscriptView {
    out: BufWriter<File>,
    written: HashSet<Uuid>,
}

impl TranscriptView {
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        out.write_all(HEADER.as_bytes())?;
        out.flush()?;
        info!("Writing transcript to {}", path.display());
        Ok(Self {
            out,
            written: HashSet::new(),
        })
    }

    fn append(&mut self, message: &MessageRecord) -> io::Result<()> {
        writeln!(self.out, "{}", message.to_html_block())?;
        self.out.flush()
    }
}

impl MessageView for TranscriptView {
    fn render(&mut self, message: &MessageRecord) {
        if !message.state.is_terminal() || !self.written.insert(message.id) {
            return;
        }
        if let Err(e) = self.append(message) {
            warn!("Failed to append to transcript: {e}");
        }
    }
}
