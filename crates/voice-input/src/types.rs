use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One recognized utterance, lowercased and trimmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: String,
    pub received_at: OffsetDateTime,
}

impl Transcript {
    pub fn new(text: &str, language: &str) -> Self {
        Self {
            text: text.trim().to_lowercase(),
            language: language.to_string(),
            received_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointerConfig {
    /// RMS level above which a frame counts as speech
    #[serde(default = "default_energy_threshold")]
    pub energy_threshold: f32,
    /// Trailing silence that ends a phrase
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u32,
    /// Phrases with less speech than this are dropped as noise
    #[serde(default = "default_min_phrase_ms")]
    pub min_phrase_ms: u32,
    #[serde(default = "default_max_phrase_ms")]
    pub max_phrase_ms: u32,
    /// Silence kept before the first speech frame
    #[serde(default = "default_non_speaking_ms")]
    pub non_speaking_ms: u32,
}

fn default_energy_threshold() -> f32 {
    300.0
}
fn default_pause_ms() -> u32 {
    800
}
fn default_min_phrase_ms() -> u32 {
    300
}
fn default_max_phrase_ms() -> u32 {
    10_000
}
fn default_non_speaking_ms() -> u32 {
    500
}

impl Default for EndpointerConfig {
    fn default() -> Self {
        Self {
            energy_threshold: default_energy_threshold(),
            pause_ms: default_pause_ms(),
            min_phrase_ms: default_min_phrase_ms(),
            max_phrase_ms: default_max_phrase_ms(),
            non_speaking_ms: default_non_speaking_ms(),
        }
    }
}

/// Remote speech-to-text endpoint. An empty endpoint means none is configured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    #[serde(default)]
    pub endpoint: String,
    /// Bearer token; falls back to `SPEECH_API_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslatorKind {
    #[default]
    Passthrough,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default)]
    pub kind: TranslatorKind,
    /// LibreTranslate-compatible `/translate` URL
    #[serde(default = "default_translate_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_translate_endpoint() -> String {
    "http://127.0.0.1:5000/translate".to_string()
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            kind: TranslatorKind::default(),
            endpoint: default_translate_endpoint(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcripts_are_trimmed_and_lowercased() {
        let t = Transcript::new("  Take OFF \n", "en");
        assert_eq!(t.text, "take off");
    }

    #[test]
    fn service_configs_default_to_a_usable_timeout() {
        assert_eq!(RecognizerConfig::default().timeout_ms, 10_000);
        assert!(RecognizerConfig::default().endpoint.is_empty());
        assert_eq!(TranslatorConfig::default().timeout_ms, 10_000);
    }
}
