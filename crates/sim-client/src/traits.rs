use crate::{ImageRequest, ImageResponse, MultirotorState, Result, Task};

/// A minimal blocking multirotor simulator interface.
///
/// Maneuver methods return as soon as the simulator accepted the command; use
/// the returned [`Task`] to wait for completion. Starting a maneuver preempts
/// the one in flight.
pub trait MultirotorClient: Send + Sync {
    /// Check that the simulator is reachable.
    fn confirm_connection(&self) -> Result<()>;

    /// Take or release API control of the vehicle.
    fn enable_api_control(&self, enabled: bool) -> Result<()>;

    /// Arm or disarm the motors. Returns the resulting armed state.
    fn arm_disarm(&self, arm: bool) -> Result<bool>;

    fn takeoff(&self) -> Result<Task>;

    fn land(&self) -> Result<Task>;

    /// Hold the current position.
    fn hover(&self) -> Result<Task>;

    /// Fly to a world-frame (NED) position at `velocity` m/s.
    fn move_to_position(&self, x: f32, y: f32, z: f32, velocity: f32) -> Result<Task>;

    /// Fly at a world-frame velocity for `duration_s` seconds.
    fn move_by_velocity(&self, vx: f32, vy: f32, vz: f32, duration_s: f32) -> Result<Task>;

    /// Yaw at `rate_deg_s` (positive is clockwise seen from above) for `duration_s` seconds.
    fn rotate_by_yaw_rate(&self, rate_deg_s: f32, duration_s: f32) -> Result<Task>;

    /// Yaw to an absolute heading in degrees.
    fn rotate_to_yaw(&self, yaw_deg: f32) -> Result<Task>;

    /// Cancel the maneuver in flight, leaving the vehicle hovering.
    fn cancel_last_task(&self) -> Result<()>;

    fn multirotor_state(&self) -> Result<MultirotorState>;

    fn sim_get_images(&self, requests: &[ImageRequest]) -> Result<Vec<ImageResponse>>;
}
