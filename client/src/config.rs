// Configuration for the chat client

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Command line flags; each one overrides its environment variable.
#[derive(Parser, Debug, Default)]
#[command(name = "chat")]
#[command(about = "Terminal client for a streaming chat backend")]
pub struct CliArgs {
    /// Base URL of the chat backend (API_URL)
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Base URL of a TTS server used for voice output (TTS_URL)
    #[arg(long, value_name = "URL")]
    pub tts_url: Option<String>,

    /// Write an HTML transcript of the conversation (TRANSCRIPT_PATH)
    #[arg(long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,

    /// Start with voice output enabled (VOICE_OUTPUT)
    #[arg(long)]
    pub voice: bool,

    /// Seconds between server status checks (STATUS_INTERVAL_SECS)
    #[arg(long, value_name = "SECS")]
    pub status_interval: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    pub api_url: String,
    /// Bounds connection setup only; a streaming reply may run longer.
    pub connect_timeout_secs: u64,
    pub status_interval_secs: u64,
    pub tts_url: Option<String>,
    pub tts_language: Option<String>,
    pub speech_output_dir: PathBuf,
    pub transcript_path: Option<PathBuf>,
    pub voice_output: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_secs: 10,
            status_interval_secs: 30,
            tts_url: None,
            tts_language: None,
            speech_output_dir: PathBuf::from("speech"),
            transcript_path: None,
            voice_output: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key/value source. Unset, empty or
    /// unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = var("API_URL").unwrap_or(defaults.api_url);

        let connect_timeout_secs = var("CONNECT_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.connect_timeout_secs);

        let status_interval_secs = var("STATUS_INTERVAL_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.status_interval_secs);

        let speech_output_dir = var("SPEECH_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.speech_output_dir);

        let voice_output = var("VOICE_OUTPUT")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(defaults.voice_output);

        Self {
            api_url,
            connect_timeout_secs,
            status_interval_secs,
            tts_url: var("TTS_URL"),
            tts_language: var("TTS_LANGUAGE"),
            speech_output_dir,
            transcript_path: var("TRANSCRIPT_PATH").map(PathBuf::from),
            voice_output,
        }
    }

    /// Apply command line overrides.
    pub fn with_args(mut self, args: &CliArgs) -> Self {
        if let Some(url) = &args.api_url {
            self.api_url = url.clone();
        }
        if let Some(url) = &args.tts_url {
            self.tts_url = Some(url.clone());
        }
        if let Some(path) = &args.transcript {
            self.transcript_path = Some(path.clone());
        }
        if args.voice {
            self.voice_output = true;
        }
        if let Some(secs) = args.status_interval.filter(|secs| *secs > 0) {
            self.status_interval_secs = secs;
        }
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}
