use crate::IntentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Everything the drone can be told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneCommand {
    TakeOff,
    Land,
    Stop,
    Up,
    Down,
    Left,
    Right,
    Forward,
    Backward,
    RotateLeft,
    RotateRight,
    /// Capture a scene image
    Scan,
    /// Capture a segmentation image
    Analyse,
}

impl DroneCommand {
    const ALL: [DroneCommand; 13] = [
        DroneCommand::TakeOff,
        DroneCommand::Land,
        DroneCommand::Stop,
        DroneCommand::Up,
        DroneCommand::Down,
        DroneCommand::Left,
        DroneCommand::Right,
        DroneCommand::Forward,
        DroneCommand::Backward,
        DroneCommand::RotateLeft,
        DroneCommand::RotateRight,
        DroneCommand::Scan,
        DroneCommand::Analyse,
    ];

    pub fn all() -> &'static [DroneCommand] {
        &Self::ALL
    }

    /// Stable machine label, e.g. `rotate_left`.
    pub fn label(self) -> &'static str {
        match self {
            DroneCommand::TakeOff => "takeoff",
            DroneCommand::Land => "land",
            DroneCommand::Stop => "stop",
            DroneCommand::Up => "up",
            DroneCommand::Down => "down",
            DroneCommand::Left => "left",
            DroneCommand::Right => "right",
            DroneCommand::Forward => "forward",
            DroneCommand::Backward => "backward",
            DroneCommand::RotateLeft => "rotate_left",
            DroneCommand::RotateRight => "rotate_right",
            DroneCommand::Scan => "scan",
            DroneCommand::Analyse => "analyse",
        }
    }

    /// Natural-language form, as offered to a classifier.
    pub fn phrase(self) -> &'static str {
        match self {
            DroneCommand::TakeOff => "take off",
            DroneCommand::RotateLeft => "rotate left",
            DroneCommand::RotateRight => "rotate right",
            other => other.label(),
        }
    }

    /// Whether the drone's position or heading changes.
    pub fn is_motion(self) -> bool {
        !matches!(
            self,
            DroneCommand::Stop | DroneCommand::Scan | DroneCommand::Analyse
        )
    }
}

impl fmt::Display for DroneCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DroneCommand {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_");
        match key.as_str() {
            "take_off" | "takeoff" => Ok(DroneCommand::TakeOff),
            "analyze" => Ok(DroneCommand::Analyse),
            other => Self::ALL
                .iter()
                .copied()
                .find(|c| c.label() == other)
                .ok_or_else(|| IntentError::UnknownLabel(s.to_string())),
        }
    }
}

/// What an utterance asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "command")]
pub enum Intent {
    Command(DroneCommand),
    /// "don't", "do not", ...
    Negation,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Command(cmd) => write!(f, "{}", cmd),
            Intent::Negation => f.write_str("negation"),
        }
    }
}

/// A matcher's verdict on one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    /// Normalized text that was classified
    pub text: String,
    /// Name of the matcher that produced it
    pub matcher: String,
}

impl Classification {
    pub fn command(&self) -> Option<DroneCommand> {
        match self.intent {
            Intent::Command(cmd) => Some(cmd),
            Intent::Negation => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_and_phrases_parse_back() {
        for &cmd in DroneCommand::all() {
            assert_eq!(cmd.label().parse::<DroneCommand>().unwrap(), cmd);
            assert_eq!(cmd.phrase().parse::<DroneCommand>().unwrap(), cmd);
        }
    }

    #[test]
    fn parsing_is_lenient_about_separators() {
        assert_eq!("Take Off".parse::<DroneCommand>().unwrap(), DroneCommand::TakeOff);
        assert_eq!("rotate-right".parse::<DroneCommand>().unwrap(), DroneCommand::RotateRight);
        assert_eq!("analyze".parse::<DroneCommand>().unwrap(), DroneCommand::Analyse);
        assert!(matches!(
            "barrel roll".parse::<DroneCommand>(),
            Err(IntentError::UnknownLabel(_))
        ));
    }

    #[test]
    fn only_stop_scan_and_analyse_are_stationary() {
        let stationary: Vec<_> = DroneCommand::all()
            .iter()
            .filter(|c| !c.is_motion())
            .collect();
        assert_eq!(stationary.len(), 3);
    }
}
