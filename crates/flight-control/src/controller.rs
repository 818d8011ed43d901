use crate::capture::save_image;
use crate::{CancelToken, FlightError, Maneuver, MotionProfile, MovementMode, Result};
use sim_client::math::{body_to_world, yaw_of};
use sim_client::{ImageRequest, ImageType, MultirotorClient, Task, TaskOutcome};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const CAMERA: &str = "0";

/// What executing a maneuver produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Motion(TaskOutcome),
    Captured(PathBuf),
}

impl Completion {
    /// A motion that was cut short before reaching its goal.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Completion::Motion(TaskOutcome::Cancelled | TaskOutcome::Preempted)
        )
    }
}

/// Runs single maneuvers against a simulator client.
pub struct DroneController {
    client: Arc<dyn MultirotorClient>,
    profile: MotionProfile,
    capture_dir: PathBuf,
    poll: Duration,
}

impl DroneController {
    pub fn new(
        client: Arc<dyn MultirotorClient>,
        profile: MotionProfile,
        capture_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        profile.validate()?;
        Ok(Self {
            client,
            profile,
            capture_dir: capture_dir.into(),
            poll: Duration::from_millis(20),
        })
    }

    /// How often an interruptible wait checks its cancel token.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll.max(Duration::from_millis(1));
        self
    }

    pub fn profile(&self) -> &MotionProfile {
        &self.profile
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    pub fn client(&self) -> &Arc<dyn MultirotorClient> {
        &self.client
    }

    /// Execute one maneuver, blocking until it is over.
    pub fn execute(&self, maneuver: &Maneuver, token: &CancelToken) -> Result<Completion> {
        info!("executing: {}", maneuver);
        match *maneuver {
            Maneuver::TakeOff => Ok(Completion::Motion(self.client.takeoff()?.join())),
            Maneuver::Land => Ok(Completion::Motion(self.client.land()?.join())),
            Maneuver::Stop => self.stop().map(Completion::Motion),
            Maneuver::Translate { dx, dy, dz } => {
                let task = self.translate(dx, dy, dz)?;
                self.wait(task, token).map(Completion::Motion)
            }
            Maneuver::Rotate {
                rate_deg_s,
                duration_s,
            } => {
                let task = self.client.rotate_by_yaw_rate(rate_deg_s, duration_s)?;
                self.wait(task, token).map(Completion::Motion)
            }
            Maneuver::Capture(kind) => self.capture(kind).map(Completion::Captured),
        }
    }

    /// Move by a body-frame offset from the current pose.
    fn translate(&self, dx: f32, dy: f32, dz: f32) -> Result<Task> {
        let state = self.client.multirotor_state()?;
        let pose = state.kinematics;
        let yaw = yaw_of(&pose.orientation);
        let (wx, wy) = body_to_world(dx, dy, yaw);
        let target = pose.position + sim_client::Vector3r::new(wx, wy, dz);
        debug!("translate from {} to {} (yaw {:.2} rad)", pose.position, target, yaw);
        Ok(self
            .client
            .move_to_position(target.x, target.y, target.z, self.profile.speed_m_s)?)
    }

    /// Brake, stop yawing, then hold position.
    fn stop(&self) -> Result<TaskOutcome> {
        self.client
            .move_by_velocity(0.0, 0.0, 0.0, self.profile.stop_brake_s)?
            .join();
        self.client.rotate_by_yaw_rate(0.0, 0.0)?.join();
        Ok(self.client.hover()?.join())
    }

    fn capture(&self, kind: ImageType) -> Result<PathBuf> {
        let responses = self
            .client
            .sim_get_images(&[ImageRequest::new(CAMERA, kind)])?;
        let image = responses.into_iter().next().ok_or(FlightError::NoImage)?;
        let path = save_image(&self.capture_dir, &image)?;
        info!("{} image saved to {}", kind.as_str(), path.display());
        Ok(path)
    }

    fn wait(&self, task: Task, token: &CancelToken) -> Result<TaskOutcome> {
        match self.profile.movement {
            MovementMode::RunToCompletion => Ok(task.join()),
            MovementMode::Interruptible => loop {
                if let Some(outcome) = task.join_timeout(self.poll) {
                    return Ok(outcome);
                }
                if token.is_cancelled() {
                    debug!("{} cancelled", task.id());
                    self.client.cancel_last_task()?;
                    return Ok(task.outcome().unwrap_or(TaskOutcome::Cancelled));
                }
            },
        }
    }
}
