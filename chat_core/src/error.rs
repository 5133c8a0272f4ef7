use thiserror::Error;

/// Errors produced while talking to the chat backend or preparing a request.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: {0}")]
    Status(u16),

    #[error("Malformed stream record: {source}")]
    MalformedRecord {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Please select an image file")]
    NotAnImage,

    #[error("Image is too large ({size} bytes). Maximum size is {max} bytes")]
    ImageTooLarge { size: u64, max: u64 },
}

impl ChatError {
    /// Whether the error ends the whole exchange rather than a single record.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChatError::Transport(_) | ChatError::Status(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
