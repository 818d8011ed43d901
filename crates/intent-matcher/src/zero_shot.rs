//! Zero-shot classification of the utterance over a fixed set of labels.

use crate::normalize::normalize;
use crate::similarity::{cosine, NgramEmbedder, TextEmbedder};
use crate::{Classification, CommandMatcher, DroneCommand, Intent, IntentError, Result};
use tracing::debug;

/// Labels offered to the classifier, in the order they are offered.
pub const CANDIDATE_LABELS: &[&str] = &[
    "take off",
    "land",
    "up",
    "down",
    "forward",
    "backward",
    "left",
    "right",
    "rotate left",
    "rotate right",
    "stop",
];

/// Scores every candidate label for a piece of text. Scores of a single-label
/// classifier sum to one; order of the result does not matter.
pub trait LabelScorer: Send + Sync {
    fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<(String, f32)>>;

    fn name(&self) -> &str;
}

/// Offline scorer: softmax over n-gram cosine similarities.
pub struct EmbeddingScorer {
    embedder: Box<dyn TextEmbedder>,
    temperature: f32,
}

impl EmbeddingScorer {
    pub fn new(temperature: f32) -> Result<Self> {
        if temperature.is_nan() || temperature <= 0.0 {
            return Err(IntentError::InvalidConfig("temperature must be positive"));
        }
        Ok(Self {
            embedder: Box::new(NgramEmbedder::default()),
            temperature,
        })
    }
}

impl Default for EmbeddingScorer {
    fn default() -> Self {
        Self {
            embedder: Box::new(NgramEmbedder::default()),
            temperature: 0.1,
        }
    }
}

impl LabelScorer for EmbeddingScorer {
    fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<(String, f32)>> {
        let v = self.embedder.embed(text);
        let logits: Vec<f32> = labels
            .iter()
            .map(|l| cosine(&v, &self.embedder.embed(l)) / self.temperature)
            .collect();
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
        let sum: f32 = exps.iter().sum();
        Ok(labels
            .iter()
            .zip(exps)
            .map(|(l, e)| (l.to_string(), if sum > 0.0 { e / sum } else { 0.0 }))
            .collect())
    }

    fn name(&self) -> &str {
        "embedding"
    }
}

/// Variant 3: the top-scoring label, accepted above a confidence threshold.
pub struct ZeroShotMatcher {
    scorer: Box<dyn LabelScorer>,
    threshold: f32,
}

impl ZeroShotMatcher {
    pub fn new(scorer: Box<dyn LabelScorer>, threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(IntentError::InvalidConfig("zero-shot threshold must be in [0, 1]"));
        }
        Ok(Self { scorer, threshold })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }
}

impl CommandMatcher for ZeroShotMatcher {
    fn name(&self) -> &str {
        "zero-shot"
    }

    fn classify(&self, text: &str) -> Result<Option<Classification>> {
        let text = normalize(text);
        if text.is_empty() {
            return Ok(None);
        }
        let scores = self.scorer.score(&text, CANDIDATE_LABELS)?;
        // Unusable scores from a remote backend never win.
        let Some((label, confidence)) = scores
            .into_iter()
            .filter(|(_, score)| score.is_finite())
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            return Ok(None);
        };
        if !CANDIDATE_LABELS.contains(&label.as_str()) {
            return Err(IntentError::UnknownLabel(label));
        }
        debug!("{:?} classified as {:?} ({:.2})", text, label, confidence);
        if confidence <= self.threshold {
            return Ok(None);
        }
        let command: DroneCommand = label.parse()?;
        Ok(Some(Classification {
            intent: Intent::Command(command),
            confidence,
            text,
            matcher: self.name().to_string(),
        }))
    }
}

#[cfg(feature = "http")]
pub use http::HfZeroShotScorer;

#[cfg(feature = "http")]
mod http {
    use super::LabelScorer;
    use crate::{IntentError, Result, ScorerConfig};
    use reqwest::header::AUTHORIZATION;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    /// Hugging Face style zero-shot inference endpoint.
    pub struct HfZeroShotScorer {
        endpoint: String,
        token: Option<String>,
        client: reqwest::blocking::Client,
    }

    impl HfZeroShotScorer {
        pub fn new(config: &ScorerConfig) -> Result<Self> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_millis(config.timeout_ms))
                .build()
                .map_err(|e| IntentError::Backend(e.to_string()))?;
            let token = config
                .token
                .clone()
                .or_else(|| std::env::var("HUGGINGFACEHUB_API_TOKEN").ok());
            Ok(Self {
                endpoint: config.endpoint.clone(),
                token,
                client,
            })
        }
    }

    #[derive(Serialize)]
    struct Parameters<'a> {
        candidate_labels: &'a [&'a str],
        multi_label: bool,
    }

    #[derive(Serialize)]
    struct Request<'a> {
        inputs: &'a str,
        parameters: Parameters<'a>,
    }

    #[derive(Deserialize)]
    struct Scores {
        labels: Vec<String>,
        scores: Vec<f32>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Response {
        One(Scores),
        Batch(Vec<Scores>),
    }

    impl LabelScorer for HfZeroShotScorer {
        fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<(String, f32)>> {
            let body = Request {
                inputs: text,
                parameters: Parameters {
                    candidate_labels: labels,
                    multi_label: false,
                },
            };
            let mut req = self.client.post(&self.endpoint).json(&body);
            if let Some(token) = &self.token {
                req = req.header(AUTHORIZATION, format!("Bearer {}", token));
            }
            let resp = req
                .send()
                .map_err(|e| IntentError::Backend(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(IntentError::Backend(format!(
                    "zero-shot: HTTP {}",
                    resp.status()
                )));
            }
            let scores = match resp
                .json::<Response>()
                .map_err(|e| IntentError::Backend(e.to_string()))?
            {
                Response::One(s) => s,
                Response::Batch(mut v) if !v.is_empty() => v.swap_remove(0),
                Response::Batch(_) => return Ok(Vec::new()),
            };
            Ok(scores.labels.into_iter().zip(scores.scores).collect())
        }

        fn name(&self) -> &str {
            "huggingface"
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    /// Returns canned scores regardless of input.
    struct Fixed(Vec<(&'static str, f32)>);

    impl LabelScorer for Fixed {
        fn score(&self, _text: &str, _labels: &[&str]) -> Result<Vec<(String, f32)>> {
            Ok(self.0.iter().map(|(l, s)| (l.to_string(), *s)).collect())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn matcher(scores: Vec<(&'static str, f32)>) -> ZeroShotMatcher {
        ZeroShotMatcher::new(Box::new(Fixed(scores)), 0.2).unwrap()
    }

    #[test]
    fn top_label_above_threshold_wins() {
        let m = matcher(vec![("land", 0.15), ("rotate left", 0.6), ("stop", 0.25)]);
        let c = m.classify("turn to the left").unwrap().unwrap();
        assert_eq!(c.command(), Some(DroneCommand::RotateLeft));
        assert!((c.confidence - 0.6).abs() < 1e-6);
        assert_eq!(c.matcher, "zero-shot");
    }

    #[test]
    fn threshold_is_strict() {
        let m = matcher(vec![("up", 0.2), ("down", 0.1)]);
        assert_eq!(m.classify("go up").unwrap(), None);
    }

    #[test]
    fn labels_outside_the_candidates_are_errors() {
        let m = matcher(vec![("do a flip", 0.9)]);
        assert!(matches!(
            m.classify("flip"),
            Err(IntentError::UnknownLabel(label)) if label == "do a flip"
        ));
    }

    #[test]
    fn non_finite_scores_are_ignored() {
        let m = matcher(vec![("up", f32::NAN), ("land", f32::INFINITY), ("down", 0.7)]);
        let c = m.classify("go down").unwrap().unwrap();
        assert_eq!(c.command(), Some(DroneCommand::Down));

        let m = matcher(vec![("up", f32::NAN)]);
        assert_eq!(m.classify("go up").unwrap(), None);
    }

    #[test]
    fn empty_input_or_scores_give_nothing() {
        let m = matcher(vec![]);
        assert_eq!(m.classify("anything").unwrap(), None);
        assert_eq!(m.classify("  ").unwrap(), None);
    }

    #[test]
    fn embedding_scorer_is_a_distribution() {
        let scorer = EmbeddingScorer::default();
        let scores = scorer.score("take off", CANDIDATE_LABELS).unwrap();
        assert_eq!(scores.len(), CANDIDATE_LABELS.len());
        let total: f32 = scores.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(EmbeddingScorer::new(0.0).is_err());
    }

    #[test]
    fn embedding_scorer_drives_the_matcher() {
        let m = ZeroShotMatcher::new(Box::new(EmbeddingScorer::default()), 0.2).unwrap();
        assert_eq!(m.scorer_name(), "embedding");
        let c = m.classify("Take off").unwrap().unwrap();
        assert_eq!(c.command(), Some(DroneCommand::TakeOff));
        let c = m.classify("rotate right").unwrap().unwrap();
        assert_eq!(c.command(), Some(DroneCommand::RotateRight));
    }
}
