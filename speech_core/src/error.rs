use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeechError {
    /// The capability is missing; the message is meant for the user.
    #[error("{0}")]
    Unsupported(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TTS server error: {0}")]
    Status(u16),

    #[error("Invalid audio: {0}")]
    Audio(#[from] hound::Error),

    #[error("Invalid base64 audio: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SpeechError>;
