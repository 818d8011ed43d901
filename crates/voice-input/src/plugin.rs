use crate::{
    CommandSource, EndpointerConfig, LineSource, Passthrough, RecognizerConfig, Result,
    Translator, TranslatorConfig, TranslatorKind, VoiceError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Phrases from a file or an inline list
    Script,
    /// Typed commands on standard input
    #[default]
    Stdin,
    /// Microphone through a remote recognizer
    Mic,
}

impl std::str::FromStr for SourceKind {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "script" => Ok(Self::Script),
            "stdin" => Ok(Self::Stdin),
            "mic" => Ok(Self::Mic),
            _ => Err(VoiceError::Unsupported("unknown source kind")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Spoken language, e.g. `en` or `hi`
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    /// Used by `script` when no path is given
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub endpointer: EndpointerConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
}

fn default_language() -> String {
    "en".to_string()
}

impl SourceOptions {
    pub fn with_language(language: &str) -> Self {
        Self {
            language: language.to_string(),
            ..Self::default()
        }
    }
}

pub fn new_command_source(
    kind: SourceKind,
    opts: &SourceOptions,
) -> Result<Box<dyn CommandSource>> {
    let language = if opts.language.is_empty() {
        "en"
    } else {
        opts.language.as_str()
    };
    match kind {
        SourceKind::Stdin => Ok(Box::new(LineSource::stdin(language))),
        SourceKind::Script => {
            #[cfg(feature = "mock")]
            {
                let source = match &opts.script_path {
                    Some(path) => crate::ScriptedSource::from_file(path, language)?,
                    None => crate::ScriptedSource::new(opts.phrases.iter().cloned(), language),
                };
                Ok(Box::new(source))
            }
            #[cfg(not(feature = "mock"))]
            {
                Err(VoiceError::Unsupported("mock feature not enabled"))
            }
        }
        SourceKind::Mic => {
            #[cfg(all(feature = "audio", feature = "http"))]
            {
                let recognizer = crate::HttpRecognizer::new(&opts.recognizer)?;
                let capture = crate::mic::MicCapture::start_default()?;
                Ok(Box::new(crate::mic::MicSource::new(
                    capture,
                    opts.endpointer.clone(),
                    recognizer,
                    language,
                )))
            }
            #[cfg(not(all(feature = "audio", feature = "http")))]
            {
                Err(VoiceError::Unsupported(
                    "mic source needs the audio and http features",
                ))
            }
        }
    }
}

pub fn new_translator(config: &TranslatorConfig) -> Result<Box<dyn Translator>> {
    match config.kind {
        TranslatorKind::Passthrough => Ok(Box::new(Passthrough)),
        TranslatorKind::Http => {
            #[cfg(feature = "http")]
            {
                Ok(Box::new(crate::HttpTranslator::new(config)?))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(VoiceError::Unsupported("http feature not enabled"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kinds_parse() {
        assert_eq!("Script".parse::<SourceKind>().unwrap(), SourceKind::Script);
        assert_eq!(" mic ".parse::<SourceKind>().unwrap(), SourceKind::Mic);
        assert!("webcam".parse::<SourceKind>().is_err());
    }

    #[cfg(feature = "mock")]
    #[test]
    fn inline_script_source() {
        let opts = SourceOptions {
            phrases: vec!["up".into(), "land".into()],
            ..SourceOptions::with_language("en")
        };
        let mut source = new_command_source(SourceKind::Script, &opts).unwrap();
        assert_eq!(source.name(), "script");
        assert_eq!(source.next_utterance().unwrap().unwrap().text, "up");
    }

    #[test]
    fn default_translator_is_passthrough() {
        let t = new_translator(&TranslatorConfig::default()).unwrap();
        assert_eq!(t.name(), "passthrough");
    }

    #[cfg(not(all(feature = "audio", feature = "http")))]
    #[test]
    fn mic_without_features_is_unsupported() {
        let err = new_command_source(SourceKind::Mic, &SourceOptions::default());
        assert!(matches!(err, Err(VoiceError::Unsupported(_))));
    }
}
