//! Energy-based utterance segmentation.

use crate::EndpointerConfig;
use std::collections::VecDeque;

const FRAME_MS: u64 = 20;

/// Root-mean-square level of a block of samples.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// Splits a continuous PCM stream into utterances.
///
/// A phrase starts with the first frame louder than the energy threshold and
/// ends after `pause_ms` of quiet frames. Up to `non_speaking_ms` of silence is
/// kept on each side of the speech.
pub struct Endpointer {
    config: EndpointerConfig,
    sample_rate_hz: u32,
    frame_len: usize,
    pending: VecDeque<i16>,
    preroll: VecDeque<i16>,
    phrase: Vec<i16>,
    in_speech: bool,
    speech_samples: usize,
    silence_samples: usize,
}

impl Endpointer {
    pub fn new(config: EndpointerConfig, sample_rate_hz: u32) -> Self {
        let frame_len = ((u64::from(sample_rate_hz) * FRAME_MS) / 1000).max(1) as usize;
        Self {
            config,
            sample_rate_hz,
            frame_len,
            pending: VecDeque::new(),
            preroll: VecDeque::new(),
            phrase: Vec::new(),
            in_speech: false,
            speech_samples: 0,
            silence_samples: 0,
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Feed audio; returns the first utterance completed by it, if any.
    /// Audio after the end of that utterance stays buffered for [`Endpointer::poll`].
    pub fn push(&mut self, pcm: &[i16]) -> Option<Vec<i16>> {
        self.pending.extend(pcm.iter().copied());
        self.poll()
    }

    /// Process buffered audio without feeding more.
    pub fn poll(&mut self) -> Option<Vec<i16>> {
        while self.pending.len() >= self.frame_len {
            let frame: Vec<i16> = self.pending.drain(..self.frame_len).collect();
            if let Some(utterance) = self.process_frame(&frame) {
                return Some(utterance);
            }
        }
        None
    }

    /// End of stream: close any open phrase.
    pub fn flush(&mut self) -> Option<Vec<i16>> {
        let rest: Vec<i16> = self.pending.drain(..).collect();
        if !rest.is_empty() {
            if let Some(utterance) = self.process_frame(&rest) {
                return Some(utterance);
            }
        }
        if self.in_speech {
            self.finish_phrase()
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.preroll.clear();
        self.phrase.clear();
        self.in_speech = false;
        self.speech_samples = 0;
        self.silence_samples = 0;
    }

    fn samples(&self, ms: u32) -> usize {
        (u64::from(self.sample_rate_hz) * u64::from(ms) / 1000) as usize
    }

    fn process_frame(&mut self, frame: &[i16]) -> Option<Vec<i16>> {
        let loud = rms(frame) > self.config.energy_threshold;

        if !self.in_speech {
            if loud {
                self.in_speech = true;
                self.phrase.clear();
                self.phrase.extend(self.preroll.drain(..));
                self.phrase.extend_from_slice(frame);
                self.speech_samples = frame.len();
                self.silence_samples = 0;
            } else {
                self.preroll.extend(frame.iter().copied());
                let keep = self.samples(self.config.non_speaking_ms);
                while self.preroll.len() > keep {
                    self.preroll.pop_front();
                }
            }
            return None;
        }

        self.phrase.extend_from_slice(frame);
        if loud {
            self.speech_samples += frame.len();
            self.silence_samples = 0;
        } else {
            self.silence_samples += frame.len();
        }

        if self.silence_samples >= self.samples(self.config.pause_ms)
            || self.phrase.len() >= self.samples(self.config.max_phrase_ms)
        {
            return self.finish_phrase();
        }
        None
    }

    fn finish_phrase(&mut self) -> Option<Vec<i16>> {
        let mut phrase = std::mem::take(&mut self.phrase);
        let excess = self
            .silence_samples
            .saturating_sub(self.samples(self.config.non_speaking_ms));
        phrase.truncate(phrase.len().saturating_sub(excess));

        let enough_speech = self.speech_samples >= self.samples(self.config.min_phrase_ms);
        self.in_speech = false;
        self.speech_samples = 0;
        self.silence_samples = 0;

        enough_speech.then_some(phrase)
    }
}
