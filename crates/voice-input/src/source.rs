use crate::{CommandSource, Result, Transcript, VoiceError};
use std::io::{BufRead, BufReader, Stdin};

/// Typed commands, one per line. Useful when no microphone is available.
pub struct LineSource<R> {
    reader: R,
    language: String,
    name: &'static str,
}

impl<R: BufRead + Send> LineSource<R> {
    pub fn new(reader: R, language: &str) -> Self {
        Self {
            reader,
            language: language.to_string(),
            name: "lines",
        }
    }
}

impl LineSource<BufReader<Stdin>> {
    pub fn stdin(language: &str) -> Self {
        Self {
            reader: BufReader::new(std::io::stdin()),
            language: language.to_string(),
            name: "stdin",
        }
    }
}

impl<R: BufRead + Send> CommandSource for LineSource<R> {
    fn next_utterance(&mut self) -> Result<Option<Transcript>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.starts_with('#') {
                continue;
            }
            if trimmed.is_empty() {
                return Err(VoiceError::NotUnderstood);
            }
            return Ok(Some(Transcript::new(trimmed, &self.language)));
        }
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_until_eof() {
        let input = Cursor::new("# comment\nRotate Left\n\nland\n");
        let mut source = LineSource::new(input, "es");

        let first = source.next_utterance().unwrap().unwrap();
        assert_eq!(first.text, "rotate left");
        assert_eq!(first.language, "es");
        assert!(matches!(
            source.next_utterance(),
            Err(VoiceError::NotUnderstood)
        ));
        assert_eq!(source.next_utterance().unwrap().unwrap().text, "land");
        assert!(source.next_utterance().unwrap().is_none());
    }
}
