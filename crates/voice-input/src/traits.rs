use crate::{Result, Transcript};

/// Produces one transcript per spoken command.
pub trait CommandSource: Send {
    /// Block until the next utterance. `Ok(None)` means the input is exhausted.
    fn next_utterance(&mut self) -> Result<Option<Transcript>>;

    fn name(&self) -> &str;
}

/// Speech-to-text for one endpointed utterance of mono 16-bit PCM.
pub trait Recognizer: Send {
    fn recognize(&self, pcm: &[i16], sample_rate_hz: u32, language: &str) -> Result<String>;
}

/// Translation of a transcript into lowercased English.
pub trait Translator: Send + Sync {
    fn translate(&self, text: &str, source_language: &str) -> Result<String>;

    fn name(&self) -> &str;
}
