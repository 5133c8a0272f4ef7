use chat_core::ChatError;
use speech_core::SpeechError;
use thiserror::Error;

/// Errors surfaced to the person at the terminal
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Speech(#[from] SpeechError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// One line to print for the user; details go to the log.
    pub fn notice(&self) -> String {
        match self {
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Chat(ChatError::NotAnImage) => "Please select an image file".to_string(),
            AppError::Chat(ChatError::ImageTooLarge { max, .. }) => {
                format!("Image too large (max {} MB)", max / (1024 * 1024))
            }
            AppError::Chat(ChatError::Io(e)) => {
                tracing::warn!("Attachment read failed: {}", e);
                format!("Could not read file: {}", e)
            }
            AppError::Chat(e) if e.is_transport() => {
                tracing::error!("Backend unreachable: {}", e);
                "Backend error. Make sure the server is running.".to_string()
            }
            AppError::Chat(e) => e.to_string(),
            AppError::Speech(SpeechError::Unsupported(msg)) => msg.to_string(),
            AppError::Speech(e) => {
                tracing::error!("Speech error: {}", e);
                format!("Speech error: {}", e)
            }
            AppError::Io(e) => e.to_string(),
        }
    }
}
