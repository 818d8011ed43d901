use crate::{FlightError, Result};
use intent_matcher::MatcherKind;
use serde::{Deserialize, Serialize};

/// How a worker waits for a motion maneuver.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// The maneuver always finishes; a newer command waits for it.
    RunToCompletion,
    /// A newer command cancels the maneuver in flight.
    Interruptible,
}

/// Step sizes and rates used to turn commands into maneuvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Forward/backward/left/right distance (m)
    pub horizontal_step_m: f32,
    /// Up/down distance (m)
    pub vertical_step_m: f32,
    pub speed_m_s: f32,
    pub yaw_rate_deg_s: f32,
    pub rotate_duration_s: f32,
    pub movement: MovementMode,
    /// Zero-velocity hold before hovering on stop (s)
    #[serde(default = "default_stop_brake_s")]
    pub stop_brake_s: f32,
}

fn default_stop_brake_s() -> f32 {
    1.0
}

impl MotionProfile {
    /// Short, discrete steps that always complete.
    pub fn keyword() -> Self {
        Self {
            horizontal_step_m: 4.0,
            vertical_step_m: 4.0,
            speed_m_s: 2.0,
            yaw_rate_deg_s: 10.0,
            rotate_duration_s: 3.0,
            movement: MovementMode::RunToCompletion,
            stop_brake_s: default_stop_brake_s(),
        }
    }

    /// Keep going until told otherwise.
    pub fn similarity() -> Self {
        Self {
            horizontal_step_m: 500.0,
            vertical_step_m: 100.0,
            speed_m_s: 1.0,
            yaw_rate_deg_s: 10.0,
            rotate_duration_s: 9999.0,
            movement: MovementMode::Interruptible,
            stop_brake_s: default_stop_brake_s(),
        }
    }

    pub fn zero_shot() -> Self {
        Self {
            horizontal_step_m: 50.0,
            vertical_step_m: 10.0,
            ..Self::similarity()
        }
    }

    pub fn for_matcher(kind: MatcherKind) -> Self {
        match kind {
            MatcherKind::Keyword => Self::keyword(),
            MatcherKind::Similarity => Self::similarity(),
            MatcherKind::ZeroShot => Self::zero_shot(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = |v: f32| v.is_finite() && v > 0.0;
        if !positive(self.horizontal_step_m) || !positive(self.vertical_step_m) {
            return Err(FlightError::InvalidProfile("step sizes must be positive"));
        }
        if !positive(self.speed_m_s) {
            return Err(FlightError::InvalidProfile("speed must be positive"));
        }
        if !positive(self.yaw_rate_deg_s) || !positive(self.rotate_duration_s) {
            return Err(FlightError::InvalidProfile("rotation rate and duration must be positive"));
        }
        if !self.stop_brake_s.is_finite() || self.stop_brake_s < 0.0 {
            return Err(FlightError::InvalidProfile("stop brake must not be negative"));
        }
        Ok(())
    }
}

impl Default for MotionProfile {
    fn default() -> Self {
        Self::keyword()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_match_their_matchers() {
        let zs = MotionProfile::for_matcher(MatcherKind::ZeroShot);
        assert_eq!((zs.horizontal_step_m, zs.vertical_step_m), (50.0, 10.0));
        assert_eq!(zs.movement, MovementMode::Interruptible);

        let kw = MotionProfile::for_matcher(MatcherKind::Keyword);
        assert_eq!(kw.movement, MovementMode::RunToCompletion);
        assert_eq!(kw.rotate_duration_s, 3.0);

        for kind in MatcherKind::ALL {
            assert!(MotionProfile::for_matcher(kind).validate().is_ok());
        }
    }

    #[test]
    fn bad_profiles_are_rejected() {
        let mut p = MotionProfile::keyword();
        p.speed_m_s = 0.0;
        assert!(p.validate().is_err());

        let mut p = MotionProfile::similarity();
        p.stop_brake_s = f32::NAN;
        assert!(p.validate().is_err());
    }
}
