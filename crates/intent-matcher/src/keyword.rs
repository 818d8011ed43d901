//! Rule-based matching against a synonym table.

use crate::normalize::{normalize, tokens};
use crate::{Classification, CommandMatcher, DroneCommand, Intent, MatchMode, Result};
use regex::Regex;
use tracing::debug;

/// Synonyms in priority order. Romanized Hindi words sit next to their English
/// counterparts so untranslated speech still works.
const SYNONYMS: &[(DroneCommand, &[&str])] = &[
    (
        DroneCommand::TakeOff,
        &["take off", "takeoff", "launch", "start", "begin", "lift"],
    ),
    (
        DroneCommand::Land,
        &["land", "touchdown", "come down", "descend ground"],
    ),
    (
        DroneCommand::Stop,
        &["stop", "halt", "pause", "freeze", "stay", "hover"],
    ),
    (
        DroneCommand::Up,
        &["up", "higher", "ascend", "upward", "upar"],
    ),
    (
        DroneCommand::Down,
        &["down", "lower", "descend", "downward", "niche"],
    ),
    (DroneCommand::Left, &["left", "leftward", "baye"]),
    (DroneCommand::Right, &["right", "rightward", "daye"]),
    (
        DroneCommand::Forward,
        &["forward", "ahead", "straight", "front", "age"],
    ),
    (
        DroneCommand::Backward,
        &["backward", "back", "reverse", "backwards", "piche"],
    ),
    (
        DroneCommand::RotateLeft,
        &["rotate left", "turn left", "spin left", "spin counterclockwise"],
    ),
    (
        DroneCommand::RotateRight,
        &["rotate right", "turn right", "spin right", "spin clockwise"],
    ),
];

const NEGATIONS: &[&str] = &["dont", "don't", "not"];
const ROTATE_VERBS: &[&str] = &["rotate", "turn", "spin"];

fn is_rotation(cmd: DroneCommand) -> bool {
    matches!(cmd, DroneCommand::RotateLeft | DroneCommand::RotateRight)
}

/// A phrase looked for in the utterance.
struct Needle {
    phrase: &'static str,
    word: Option<Regex>,
}

impl Needle {
    fn new(phrase: &'static str, mode: MatchMode) -> Result<Self> {
        let word = match mode {
            MatchMode::Substring => None,
            MatchMode::WordBoundary => Some(Regex::new(&format!(
                r"\b{}\b",
                regex::escape(phrase)
            ))?),
        };
        Ok(Self { phrase, word })
    }

    fn found_in(&self, text: &str) -> bool {
        match &self.word {
            Some(re) => re.is_match(text),
            None => text.contains(self.phrase),
        }
    }
}

fn needles(phrases: &[&'static str], mode: MatchMode) -> Result<Vec<Needle>> {
    phrases.iter().map(|p| Needle::new(p, mode)).collect()
}

fn any_found(needles: &[Needle], text: &str) -> bool {
    needles.iter().any(|n| n.found_in(text))
}

/// Variant 1: exact synonym lookup with explicit stop, negation and rotation rules.
pub struct KeywordMatcher {
    mode: MatchMode,
    table: Vec<(DroneCommand, Vec<Needle>)>,
    stop: Vec<Needle>,
    rotate_verbs: Vec<Needle>,
    left: Vec<Needle>,
    right: Vec<Needle>,
}

impl KeywordMatcher {
    pub fn new(mode: MatchMode) -> Result<Self> {
        let mut table = Vec::with_capacity(SYNONYMS.len());
        for (cmd, phrases) in SYNONYMS {
            table.push((*cmd, needles(phrases, mode)?));
        }
        let stop = SYNONYMS
            .iter()
            .find(|(cmd, _)| *cmd == DroneCommand::Stop)
            .map(|(_, phrases)| needles(phrases, mode))
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            mode,
            table,
            stop,
            rotate_verbs: needles(ROTATE_VERBS, mode)?,
            left: needles(&["left", "counterclockwise"], mode)?,
            right: needles(&["right", "clockwise"], mode)?,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    fn decide(&self, text: &str) -> Option<Intent> {
        if any_found(&self.stop, text) {
            return Some(Intent::Command(DroneCommand::Stop));
        }
        if tokens(text).iter().any(|t| NEGATIONS.contains(t)) {
            return Some(Intent::Negation);
        }

        let rotating = any_found(&self.rotate_verbs, text);
        if rotating {
            // "counterclockwise" contains "clockwise": left is checked first.
            if any_found(&self.left, text) {
                return Some(Intent::Command(DroneCommand::RotateLeft));
            }
            if any_found(&self.right, text) {
                return Some(Intent::Command(DroneCommand::RotateRight));
            }
        }

        self.table
            .iter()
            .filter(|(cmd, _)| rotating || !is_rotation(*cmd))
            .find(|(_, needles)| any_found(needles, text))
            .map(|(cmd, _)| Intent::Command(*cmd))
    }
}

impl CommandMatcher for KeywordMatcher {
    fn name(&self) -> &str {
        "keyword"
    }

    fn classify(&self, text: &str) -> Result<Option<Classification>> {
        let text = normalize(text);
        if text.is_empty() {
            return Ok(None);
        }
        let Some(intent) = self.decide(&text) else {
            debug!("no keyword in {:?}", text);
            return Ok(None);
        };
        Ok(Some(Classification {
            intent,
            confidence: 1.0,
            text,
            matcher: self.name().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(m: &KeywordMatcher, text: &str) -> Option<Intent> {
        m.classify(text).unwrap().map(|c| c.intent)
    }

    fn cmd(c: DroneCommand) -> Option<Intent> {
        Some(Intent::Command(c))
    }

    #[test]
    fn plain_commands() {
        let m = KeywordMatcher::new(MatchMode::Substring).unwrap();
        assert_eq!(intent(&m, "Take off please"), cmd(DroneCommand::TakeOff));
        assert_eq!(intent(&m, "land now"), cmd(DroneCommand::Land));
        assert_eq!(intent(&m, "go higher"), cmd(DroneCommand::Up));
        assert_eq!(intent(&m, "move back"), cmd(DroneCommand::Backward));
        assert_eq!(intent(&m, "upar"), cmd(DroneCommand::Up));
        assert_eq!(intent(&m, "hello there"), None);
        assert_eq!(intent(&m, "   "), None);
    }

    #[test]
    fn stop_beats_everything() {
        let m = KeywordMatcher::new(MatchMode::Substring).unwrap();
        assert_eq!(intent(&m, "don't stop"), cmd(DroneCommand::Stop));
        assert_eq!(intent(&m, "stay up there"), cmd(DroneCommand::Stop));
    }

    #[test]
    fn negation_needs_a_whole_token() {
        let m = KeywordMatcher::new(MatchMode::Substring).unwrap();
        assert_eq!(intent(&m, "Don't go left"), Some(Intent::Negation));
        assert_eq!(intent(&m, "do not land"), Some(Intent::Negation));
        // "nothing" contains "not" but is not a negation token
        assert_eq!(intent(&m, "nothing left"), cmd(DroneCommand::Left));
    }

    #[test]
    fn rotation_requires_a_rotate_verb() {
        let m = KeywordMatcher::new(MatchMode::Substring).unwrap();
        assert_eq!(intent(&m, "turn left"), cmd(DroneCommand::RotateLeft));
        assert_eq!(intent(&m, "spin counterclockwise"), cmd(DroneCommand::RotateLeft));
        assert_eq!(intent(&m, "rotate clockwise"), cmd(DroneCommand::RotateRight));
        assert_eq!(intent(&m, "go left"), cmd(DroneCommand::Left));
        assert_eq!(intent(&m, "right"), cmd(DroneCommand::Right));
    }

    #[test]
    fn table_order_breaks_ties() {
        let m = KeywordMatcher::new(MatchMode::Substring).unwrap();
        // "come down" is a land synonym, listed before down
        assert_eq!(intent(&m, "come down"), cmd(DroneCommand::Land));
        assert_eq!(intent(&m, "launch and go up"), cmd(DroneCommand::TakeOff));
    }

    #[test]
    fn word_boundary_mode_ignores_fragments() {
        let sub = KeywordMatcher::new(MatchMode::Substring).unwrap();
        let word = KeywordMatcher::new(MatchMode::WordBoundary).unwrap();
        // "message" contains the romanized "age"
        assert_eq!(intent(&sub, "message"), cmd(DroneCommand::Forward));
        assert_eq!(intent(&word, "message"), None);
        assert_eq!(intent(&word, "go forward"), cmd(DroneCommand::Forward));
        assert_eq!(word.mode(), MatchMode::WordBoundary);
    }

    #[test]
    fn classification_carries_normalized_text() {
        let m = KeywordMatcher::new(MatchMode::Substring).unwrap();
        let c = m.classify("  LAND!").unwrap().unwrap();
        assert_eq!(c.text, "land");
        assert_eq!(c.matcher, "keyword");
        assert_eq!(c.confidence, 1.0);
    }
}
