//! intent-matcher: English transcript → drone command
//!
//! Three interchangeable [`CommandMatcher`]s:
//! - [`KeywordMatcher`]: synonym table with explicit stop, negation and rotation rules
//! - [`SimilarityMatcher`]: best cosine similarity between the utterance and synonyms
//! - [`ZeroShotMatcher`]: top label from a [`LabelScorer`] over the command names

mod commands;
pub use commands::{Classification, DroneCommand, Intent};

mod error;
pub use error::{IntentError, Result};

pub mod normalize;

mod keyword;
pub use keyword::KeywordMatcher;

mod similarity;
pub use similarity::{cosine, NgramEmbedder, SimilarityMatcher, TextEmbedder};

mod zero_shot;
#[cfg(feature = "http")]
pub use zero_shot::HfZeroShotScorer;
pub use zero_shot::{EmbeddingScorer, LabelScorer, ZeroShotMatcher, CANDIDATE_LABELS};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifies one utterance.
pub trait CommandMatcher: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(None)` when nothing matched.
    fn classify(&self, text: &str) -> Result<Option<Classification>>;
}

/// How keyword synonyms are found in the text.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Substring,
    WordBoundary,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherKind {
    #[default]
    Keyword,
    Similarity,
    ZeroShot,
}

impl MatcherKind {
    pub const ALL: [MatcherKind; 3] = [
        MatcherKind::Keyword,
        MatcherKind::Similarity,
        MatcherKind::ZeroShot,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MatcherKind::Keyword => "keyword",
            MatcherKind::Similarity => "similarity",
            MatcherKind::ZeroShot => "zero-shot",
        }
    }

    /// What a negation does by default with this matcher.
    pub fn default_negation(self) -> NegationPolicy {
        match self {
            MatcherKind::Keyword => NegationPolicy::Stop,
            MatcherKind::Similarity | MatcherKind::ZeroShot => NegationPolicy::Ignore,
        }
    }
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatcherKind {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "keyword" | "rule-based" => Ok(MatcherKind::Keyword),
            "similarity" | "nlp" => Ok(MatcherKind::Similarity),
            "zero-shot" | "zeroshot" => Ok(MatcherKind::ZeroShot),
            _ => Err(IntentError::InvalidConfig("unknown matcher kind")),
        }
    }
}

/// Response to an utterance classified as a negation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegationPolicy {
    /// Halt whatever the drone is doing
    Stop,
    /// Log it and carry on
    Ignore,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerKind {
    /// Offline n-gram scorer
    #[default]
    Embedding,
    /// Hugging Face inference endpoint
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default)]
    pub kind: ScorerKind,
    #[serde(default = "default_scorer_endpoint")]
    pub endpoint: String,
    /// Falls back to `HUGGINGFACEHUB_API_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_scorer_endpoint() -> String {
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            kind: ScorerKind::default(),
            endpoint: default_scorer_endpoint(),
            token: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Configuration for all matcher variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    #[serde(default)]
    pub kind: MatcherKind,
    #[serde(default)]
    pub match_mode: MatchMode,
    /// Minimum cosine similarity (exclusive) for the similarity matcher
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Minimum label score (exclusive) for the zero-shot matcher
    #[serde(default = "default_zero_shot_threshold")]
    pub zero_shot_threshold: f32,
    /// Overrides [`MatcherKind::default_negation`]
    #[serde(default)]
    pub negation: Option<NegationPolicy>,
    #[serde(default)]
    pub scorer: ScorerConfig,
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_zero_shot_threshold() -> f32 {
    0.2
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            kind: MatcherKind::default(),
            match_mode: MatchMode::default(),
            similarity_threshold: default_similarity_threshold(),
            zero_shot_threshold: default_zero_shot_threshold(),
            negation: None,
            scorer: ScorerConfig::default(),
        }
    }
}

impl MatcherConfig {
    pub fn negation_policy(&self, kind: MatcherKind) -> NegationPolicy {
        self.negation.unwrap_or_else(|| kind.default_negation())
    }
}

pub fn new_label_scorer(config: &ScorerConfig) -> Result<Box<dyn LabelScorer>> {
    match config.kind {
        ScorerKind::Embedding => Ok(Box::new(EmbeddingScorer::default())),
        ScorerKind::Http => {
            #[cfg(feature = "http")]
            {
                Ok(Box::new(HfZeroShotScorer::new(config)?))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(IntentError::Unsupported("http feature not enabled"))
            }
        }
    }
}

/// Build a matcher of the given kind.
pub fn create_matcher(kind: MatcherKind, config: &MatcherConfig) -> Result<Box<dyn CommandMatcher>> {
    tracing::debug!("creating {} matcher", kind);
    match kind {
        MatcherKind::Keyword => Ok(Box::new(KeywordMatcher::new(config.match_mode)?)),
        MatcherKind::Similarity => Ok(Box::new(SimilarityMatcher::new(
            config.similarity_threshold,
        )?)),
        MatcherKind::ZeroShot => Ok(Box::new(ZeroShotMatcher::new(
            new_label_scorer(&config.scorer)?,
            config.zero_shot_threshold,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_can_be_created_offline() -> anyhow::Result<()> {
        let config = MatcherConfig::default();
        for kind in MatcherKind::ALL {
            let m = create_matcher(kind, &config)?;
            assert_eq!(m.name(), kind.as_str());
            let c = m.classify("land")?;
            assert_eq!(c.and_then(|c| c.command()), Some(DroneCommand::Land));
        }
        Ok(())
    }

    #[test]
    fn kinds_parse_from_cli_spellings() {
        assert_eq!("zero_shot".parse::<MatcherKind>().unwrap(), MatcherKind::ZeroShot);
        assert_eq!("Similarity".parse::<MatcherKind>().unwrap(), MatcherKind::Similarity);
        assert!("magic".parse::<MatcherKind>().is_err());
    }

    #[test]
    fn negation_policy_defaults_per_kind() {
        let mut config = MatcherConfig::default();
        assert_eq!(config.negation_policy(MatcherKind::Keyword), NegationPolicy::Stop);
        assert_eq!(config.negation_policy(MatcherKind::ZeroShot), NegationPolicy::Ignore);
        config.negation = Some(NegationPolicy::Stop);
        assert_eq!(config.negation_policy(MatcherKind::Similarity), NegationPolicy::Stop);
    }

    #[cfg(not(feature = "http"))]
    #[test]
    fn http_scorer_needs_the_feature() {
        let config = ScorerConfig {
            kind: ScorerKind::Http,
            ..ScorerConfig::default()
        };
        assert!(matches!(
            new_label_scorer(&config),
            Err(IntentError::Unsupported(_))
        ));
    }
}
