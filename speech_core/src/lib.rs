//! Speech support for the chat client: reading replies aloud and turning
//! voice input into text.

pub mod clean;
pub mod error;
pub mod recognition;
pub mod remote;
pub mod synth;
pub mod voice;
pub mod wav;

pub use clean::clean_text_for_speech;
pub use error::{Result, SpeechError};
pub use recognition::{
    ChannelSource, RecognitionEvent, RecognitionResult, RecognitionSource, TranscriptUpdate,
    VoiceInput,
};
pub use remote::RemoteTts;
pub use synth::{SpeechEngine, Speaker, Utterance};
pub use voice::{choose_voice, VoiceInfo};
