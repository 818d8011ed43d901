use crate::MotionProfile;
use intent_matcher::DroneCommand;
use sim_client::ImageType;
use std::fmt;

/// A concrete simulator action. Offsets are body-frame NED: +x forward,
/// +y right, +z down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Maneuver {
    TakeOff,
    Land,
    Stop,
    Translate { dx: f32, dy: f32, dz: f32 },
    /// Positive rate turns clockwise seen from above.
    Rotate { rate_deg_s: f32, duration_s: f32 },
    Capture(ImageType),
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maneuver::TakeOff => f.write_str("take off"),
            Maneuver::Land => f.write_str("land"),
            Maneuver::Stop => f.write_str("stop"),
            Maneuver::Translate { dx, dy, dz } => {
                write!(f, "translate by ({dx:.1}, {dy:.1}, {dz:.1}) m")
            }
            Maneuver::Rotate {
                rate_deg_s,
                duration_s,
            } => write!(f, "rotate at {rate_deg_s:.1} deg/s for {duration_s:.0} s"),
            Maneuver::Capture(kind) => write!(f, "capture {} image", kind.as_str()),
        }
    }
}

pub fn plan(command: DroneCommand, profile: &MotionProfile) -> Maneuver {
    let h = profile.horizontal_step_m;
    let v = profile.vertical_step_m;
    let translate = |dx, dy, dz| Maneuver::Translate { dx, dy, dz };
    match command {
        DroneCommand::TakeOff => Maneuver::TakeOff,
        DroneCommand::Land => Maneuver::Land,
        DroneCommand::Stop => Maneuver::Stop,
        DroneCommand::Up => translate(0.0, 0.0, -v),
        DroneCommand::Down => translate(0.0, 0.0, v),
        DroneCommand::Forward => translate(h, 0.0, 0.0),
        DroneCommand::Backward => translate(-h, 0.0, 0.0),
        DroneCommand::Left => translate(0.0, -h, 0.0),
        DroneCommand::Right => translate(0.0, h, 0.0),
        DroneCommand::RotateLeft => Maneuver::Rotate {
            rate_deg_s: -profile.yaw_rate_deg_s,
            duration_s: profile.rotate_duration_s,
        },
        DroneCommand::RotateRight => Maneuver::Rotate {
            rate_deg_s: profile.yaw_rate_deg_s,
            duration_s: profile.rotate_duration_s,
        },
        DroneCommand::Scan => Maneuver::Capture(ImageType::Scene),
        DroneCommand::Analyse => Maneuver::Capture(ImageType::Segmentation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_follow_ned() {
        let p = MotionProfile::keyword();
        assert_eq!(
            plan(DroneCommand::Up, &p),
            Maneuver::Translate { dx: 0.0, dy: 0.0, dz: -4.0 }
        );
        assert_eq!(
            plan(DroneCommand::Left, &p),
            Maneuver::Translate { dx: 0.0, dy: -4.0, dz: 0.0 }
        );
        assert_eq!(
            plan(DroneCommand::Backward, &p),
            Maneuver::Translate { dx: -4.0, dy: 0.0, dz: 0.0 }
        );
    }

    #[test]
    fn rotations_and_captures() {
        let p = MotionProfile::similarity();
        assert_eq!(
            plan(DroneCommand::RotateLeft, &p),
            Maneuver::Rotate { rate_deg_s: -10.0, duration_s: 9999.0 }
        );
        assert_eq!(
            plan(DroneCommand::Analyse, &p),
            Maneuver::Capture(ImageType::Segmentation)
        );
        assert_eq!(plan(DroneCommand::Scan, &p).to_string(), "capture scene image");
    }
}
