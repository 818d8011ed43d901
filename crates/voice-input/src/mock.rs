use crate::{CommandSource, Result, Transcript, VoiceError};
use std::collections::VecDeque;
use std::path::Path;

/// Replays a fixed list of phrases as if they had been spoken.
///
/// Blank phrases stand in for audio the recognizer could not understand.
pub struct ScriptedSource {
    phrases: VecDeque<String>,
    language: String,
}

impl ScriptedSource {
    pub fn new<I, S>(phrases: I, language: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
            language: language.to_string(),
        }
    }

    /// One phrase per line; `#` comment lines are skipped.
    pub fn from_file(path: impl AsRef<Path>, language: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let phrases = raw
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .map(str::to_string);
        Ok(Self::new(phrases, language))
    }

    pub fn remaining(&self) -> usize {
        self.phrases.len()
    }
}

impl CommandSource for ScriptedSource {
    fn next_utterance(&mut self) -> Result<Option<Transcript>> {
        let Some(phrase) = self.phrases.pop_front() else {
            return Ok(None);
        };
        if phrase.trim().is_empty() {
            return Err(VoiceError::NotUnderstood);
        }
        Ok(Some(Transcript::new(&phrase, &self.language)))
    }

    fn name(&self) -> &str {
        "script"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_phrases_then_ends() {
        let mut source = ScriptedSource::new(["Take Off ", "", "go LEFT"], "en");
        assert_eq!(source.next_utterance().unwrap().unwrap().text, "take off");
        assert!(matches!(
            source.next_utterance(),
            Err(VoiceError::NotUnderstood)
        ));
        let t = source.next_utterance().unwrap().unwrap();
        assert_eq!((t.text.as_str(), t.language.as_str()), ("go left", "en"));
        assert!(source.next_utterance().unwrap().is_none());
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn script_files_skip_comments() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("script.txt");
        std::fs::write(&path, "# warm up\ntakeoff\n  # hover a bit\nland\n")?;

        let mut source = ScriptedSource::from_file(&path, "hi")?;
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_utterance()?.map(|t| t.text), Some("takeoff".into()));
        Ok(())
    }
}
