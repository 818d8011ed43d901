//! Fuzzy matching by vector similarity between the utterance and synonyms.

use crate::normalize::{normalize, tokens};
use crate::{Classification, CommandMatcher, DroneCommand, Intent, IntentError, Result};
use tracing::debug;

const SYNONYMS: &[(DroneCommand, &[&str])] = &[
    (
        DroneCommand::TakeOff,
        &["take off", "launch", "ascend", "rise", "start", "fly", "flying"],
    ),
    (DroneCommand::Land, &["land", "touchdown"]),
    (
        DroneCommand::Up,
        &["up", "ascend", "rise", "upside", "upward"],
    ),
    (
        DroneCommand::Down,
        &["down", "descend", "lower", "below", "downside", "downward"],
    ),
    (
        DroneCommand::Forward,
        &["forward", "move forward", "advance", "front", "go"],
    ),
    (DroneCommand::Backward, &["backward", "reverse", "back"]),
    (DroneCommand::Left, &["left", "leftside", "leftward"]),
    (DroneCommand::Right, &["right", "rightside", "rightward"]),
    (
        DroneCommand::RotateLeft,
        &["rotate left", "spin left", "counterclockwise"],
    ),
    (
        DroneCommand::RotateRight,
        &["rotate right", "spin right", "clockwise"],
    ),
    (DroneCommand::Stop, &["stop", "halt", "pause", "freeze"]),
    (
        DroneCommand::Scan,
        &["scan", "survey", "inspect", "check", "search"],
    ),
    (
        DroneCommand::Analyse,
        &["record", "start recording", "begin recording", "analyse"],
    ),
];

const NEGATIONS: &[&str] = &["dont", "don't", "do not"];

/// Scores closer than this are treated as equal.
const SCORE_EPSILON: f32 = 1e-4;

/// Turns text into a fixed-size vector for cosine comparison.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Hashed character n-grams with `<`/`>` word boundary markers, L2-normalised.
#[derive(Debug, Clone)]
pub struct NgramEmbedder {
    dims: usize,
    n: usize,
}

impl NgramEmbedder {
    pub const DEFAULT_DIMS: usize = 512;
    pub const DEFAULT_N: usize = 3;

    pub fn new(dims: usize, n: usize) -> Result<Self> {
        if dims == 0 || n == 0 {
            return Err(IntentError::InvalidConfig("embedder dims and n must be positive"));
        }
        Ok(Self { dims, n })
    }

    fn bucket(&self, gram: &[char]) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for &c in gram {
            let mut buf = [0u8; 4];
            for &b in c.encode_utf8(&mut buf).as_bytes() {
                hash ^= u64::from(b);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
        }
        (hash % self.dims as u64) as usize
    }
}

impl Default for NgramEmbedder {
    fn default() -> Self {
        Self {
            dims: Self::DEFAULT_DIMS,
            n: Self::DEFAULT_N,
        }
    }
}

impl TextEmbedder for NgramEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text.split_whitespace() {
            let chars: Vec<char> = std::iter::once('<')
                .chain(word.chars())
                .chain(std::iter::once('>'))
                .collect();
            if chars.len() <= self.n {
                v[self.bucket(&chars)] += 1.0;
                continue;
            }
            for gram in chars.windows(self.n) {
                v[self.bucket(gram)] += 1.0;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}

struct Keyword {
    command: DroneCommand,
    text: &'static str,
    token_count: usize,
    vector: Vec<f32>,
}

/// Variant 2: the command whose synonym is most similar to some part of the
/// utterance, if that similarity clears the threshold.
pub struct SimilarityMatcher {
    embedder: Box<dyn TextEmbedder>,
    keywords: Vec<Keyword>,
    threshold: f32,
}

impl SimilarityMatcher {
    pub fn new(threshold: f32) -> Result<Self> {
        Self::with_embedder(Box::new(NgramEmbedder::default()), threshold)
    }

    pub fn with_embedder(embedder: Box<dyn TextEmbedder>, threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(IntentError::InvalidConfig("similarity threshold must be in [0, 1]"));
        }
        let keywords: Vec<Keyword> = SYNONYMS
            .iter()
            .flat_map(|(command, phrases)| {
                phrases.iter().map(move |text| (*command, *text))
            })
            .map(|(command, text)| Keyword {
                command,
                text,
                token_count: tokens(text).len(),
                vector: embedder.embed(text),
            })
            .collect();
        Ok(Self {
            embedder,
            keywords,
            threshold,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Best cosine between the keyword and any same-length window of the
    /// utterance, or the utterance as a whole.
    fn window_score(&self, keyword: &Keyword, words: &[&str], whole: &[f32]) -> f32 {
        let mut best = cosine(&keyword.vector, whole);
        if keyword.token_count > 0 && words.len() > keyword.token_count {
            for window in words.windows(keyword.token_count) {
                let v = self.embedder.embed(&window.join(" "));
                best = best.max(cosine(&keyword.vector, &v));
            }
        }
        best
    }
}

impl CommandMatcher for SimilarityMatcher {
    fn name(&self) -> &str {
        "similarity"
    }

    fn classify(&self, text: &str) -> Result<Option<Classification>> {
        let text = normalize(text);
        if text.is_empty() {
            return Ok(None);
        }
        if NEGATIONS.iter().any(|n| text.contains(n)) {
            return Ok(Some(Classification {
                intent: Intent::Negation,
                confidence: 1.0,
                text,
                matcher: self.name().to_string(),
            }));
        }

        let words = tokens(&text);
        let whole = self.embedder.embed(&text);

        // Rank by window score, then by similarity to the whole utterance;
        // remaining ties keep the earlier table entry.
        let mut best: Option<(&Keyword, f32, f32)> = None;
        for keyword in &self.keywords {
            let score = self.window_score(keyword, &words, &whole);
            if score <= self.threshold {
                continue;
            }
            let overall = cosine(&keyword.vector, &whole);
            let better = match best {
                None => true,
                Some((_, s, o)) => {
                    score > s + SCORE_EPSILON
                        || ((score - s).abs() <= SCORE_EPSILON && overall > o + SCORE_EPSILON)
                }
            };
            if better {
                best = Some((keyword, score, overall));
            }
        }

        let Some((keyword, score, _)) = best else {
            debug!("nothing similar enough to {:?}", text);
            return Ok(None);
        };
        debug!(
            "{:?} ~ {:?} ({}) score {:.2}",
            text, keyword.text, keyword.command, score
        );
        Ok(Some(Classification {
            intent: Intent::Command(keyword.command),
            confidence: score.min(1.0),
            text,
            matcher: self.name().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(m: &SimilarityMatcher, text: &str) -> Option<DroneCommand> {
        m.classify(text).unwrap().and_then(|c| c.command())
    }

    #[test]
    fn embeddings_are_unit_length() {
        let e = NgramEmbedder::default();
        let v = e.embed("rotate left");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!(e.embed("").iter().all(|&x| x == 0.0));
        assert!((cosine(&v, &e.embed("rotate left")) - 1.0).abs() < 1e-5);
        assert_eq!(cosine(&v, &e.embed("")), 0.0);
    }

    #[test]
    fn exact_keywords_inside_longer_utterances() {
        let m = SimilarityMatcher::new(0.7).unwrap();
        assert_eq!(command(&m, "please land"), Some(DroneCommand::Land));
        assert_eq!(command(&m, "move forward now"), Some(DroneCommand::Forward));
        assert_eq!(command(&m, "scan the area"), Some(DroneCommand::Scan));
        assert_eq!(command(&m, "halt"), Some(DroneCommand::Stop));
    }

    #[test]
    fn longer_synonyms_win_ties() {
        let m = SimilarityMatcher::new(0.7).unwrap();
        assert_eq!(command(&m, "rotate left"), Some(DroneCommand::RotateLeft));
        assert_eq!(command(&m, "spin right"), Some(DroneCommand::RotateRight));
        assert_eq!(command(&m, "start recording"), Some(DroneCommand::Analyse));
        assert_eq!(command(&m, "please go left"), Some(DroneCommand::Left));
    }

    #[test]
    fn earlier_entry_wins_exact_ties() {
        let m = SimilarityMatcher::new(0.7).unwrap();
        // "ascend" is both a takeoff and an up synonym
        assert_eq!(command(&m, "ascend"), Some(DroneCommand::TakeOff));
    }

    #[test]
    fn negation_is_reported() {
        let m = SimilarityMatcher::new(0.7).unwrap();
        let c = m.classify("Do not land").unwrap().unwrap();
        assert_eq!(c.intent, Intent::Negation);
        assert_eq!(c.matcher, "similarity");
    }

    #[test]
    fn unrelated_text_is_rejected() {
        let m = SimilarityMatcher::new(0.7).unwrap();
        assert_eq!(m.classify("").unwrap(), None);
        assert_eq!(command(&m, "xyzzy"), None);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(SimilarityMatcher::new(1.5).is_err());
        assert!(NgramEmbedder::new(0, 3).is_err());
        assert_eq!(SimilarityMatcher::new(0.5).unwrap().threshold(), 0.5);
    }
}
