//! Parsing of REPL input lines.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text to send to the backend.
    Send(String),
    AttachImage(PathBuf),
    RemoveImage,
    ToggleVoice,
    Listen,
    /// Abort the reply being generated.
    Stop,
    Status,
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type a message and press Enter to send it.

  /image <path>  attach an image to the next message
  /noimage       remove the attached image
  /voice         toggle reading replies aloud
  /listen        dictate a message
  /stop          stop the reply being generated
  /status        check the server connection
  /clear         clear the conversation
  /help          show this help
  /quit          exit
  //text         send text that starts with /";

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_string())));
    };
    // A doubled slash sends the line minus one slash.
    if rest.starts_with('/') {
        return Ok(Some(Command::Send(rest.to_string())));
    }

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name {
        "image" if arg.is_empty() => return Err("Usage: /image <path>".to_string()),
        "image" => Command::AttachImage(PathBuf::from(arg)),
        "noimage" => Command::RemoveImage,
        "voice" => Command::ToggleVoice,
        "listen" => Command::Listen,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "clear" => Command::Clear,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("Unknown command /{other}. Type /help for help.")),
    };
    Ok(Some(command))
}
