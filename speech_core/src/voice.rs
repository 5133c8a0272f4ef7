use serde::{Deserialize, Serialize};

/// A voice offered by a speech engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    /// Language tag, e.g. `en-US` or `en_US`.
    pub lang: String,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    pub fn is_english(&self) -> bool {
        self.lang.starts_with("en")
    }

    /// Whether the voice speaks `lang`, ignoring case and `-` versus `_`.
    pub fn speaks(&self, lang: &str) -> bool {
        let normalize = |tag: &str| tag.replace('-', "_").to_ascii_lowercase();
        normalize(&self.lang) == normalize(lang)
    }
}

/// Prefer a voice for `language` when one is given, then an English Google
/// voice, then any English voice.
pub fn choose_voice<'a>(voices: &'a [VoiceInfo], language: Option<&str>) -> Option<&'a VoiceInfo> {
    language
        .and_then(|lang| voices.iter().find(|v| v.speaks(lang)))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.is_english() && v.name.contains("Google"))
        })
        .or_else(|| voices.iter().find(|v| v.is_english()))
}
