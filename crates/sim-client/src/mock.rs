use crate::math::{to_quaternion, wrap_angle};
use crate::{
    ImageRequest, ImageResponse, ImageType, Kinematics, LandedState, MultirotorClient,
    MultirotorState, Result, SimError, Task, TaskId, TaskOutcome, Vector3r,
};
use parking_lot::Mutex;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, trace};

const GROUND_Z: f32 = 0.0;
const AIRBORNE_EPS: f32 = 0.05;
const ARRIVAL_EPS: f32 = 1e-3;
const YAW_TO_RATE_RAD_S: f32 = PI / 4.0;
/// Leftover duration below which a timed maneuver counts as finished.
const TIMED_EPS_S: f32 = 1e-4;

const SEGMENT_PALETTE: [[u8; 3]; 4] = [[128, 64, 128], [70, 70, 70], [107, 142, 35], [70, 130, 180]];

/// Tunables for the in-process simulator.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Wall-clock period of the stepping thread
    pub tick: Duration,
    /// Simulated seconds per wall-clock second
    pub time_scale: f32,
    pub takeoff_altitude_m: f32,
    /// Climb and descent speed for takeoff and land
    pub vertical_speed_m_s: f32,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(20),
            time_scale: 1.0,
            takeoff_altitude_m: 3.0,
            vertical_speed_m_s: 1.0,
            image_width: 64,
            image_height: 48,
        }
    }
}

impl MockConfig {
    fn validate(&self) -> Result<()> {
        if self.tick.is_zero() {
            return Err(SimError::InvalidArgument("tick must be non-zero"));
        }
        if !(self.time_scale > 0.0) {
            return Err(SimError::InvalidArgument("time_scale must be positive"));
        }
        if !(self.vertical_speed_m_s > 0.0) {
            return Err(SimError::InvalidArgument("vertical speed must be positive"));
        }
        if self.image_width == 0 || self.image_height == 0 {
            return Err(SimError::InvalidArgument("image size must be non-zero"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum Maneuver {
    Hold,
    MoveTo { target: Vector3r, speed: f32 },
    Velocity { velocity: Vector3r, remaining_s: f32 },
    YawRate { rate: f32, remaining_s: f32 },
    YawTo { target: f32 },
    Climb { target_z: f32 },
    Land,
}

struct SimState {
    position: Vector3r,
    velocity: Vector3r,
    yaw: f32,
    yaw_rate: f32,
    landed: LandedState,
    armed: bool,
    api_control: bool,
    maneuver: Maneuver,
    task: Option<Task>,
    next_task_id: u64,
}

impl SimState {
    fn new() -> Self {
        Self {
            position: Vector3r::ZERO,
            velocity: Vector3r::ZERO,
            yaw: 0.0,
            yaw_rate: 0.0,
            landed: LandedState::Landed,
            armed: false,
            api_control: false,
            maneuver: Maneuver::Hold,
            task: None,
            next_task_id: 1,
        }
    }

    fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next_task_id);
        self.next_task_id += 1;
        id
    }

    fn start(&mut self, maneuver: Maneuver) -> Task {
        self.interrupt(TaskOutcome::Preempted);
        let task = Task::pending(self.next_id());
        trace!("mock-sim: {} starts {:?}", task.id(), maneuver);
        self.maneuver = maneuver;
        self.task = Some(task.clone());
        task
    }

    /// End the active maneuver early and hold position.
    fn interrupt(&mut self, outcome: TaskOutcome) {
        if let Some(task) = self.task.take() {
            if task.resolve(outcome) {
                debug!("mock-sim: {} ended {:?}", task.id(), outcome);
            }
        }
        self.hold();
    }

    fn complete(&mut self) {
        if let Some(task) = self.task.take() {
            task.resolve(TaskOutcome::Completed);
            trace!("mock-sim: {} completed", task.id());
        }
        self.hold();
    }

    fn hold(&mut self) {
        self.maneuver = Maneuver::Hold;
        self.velocity = Vector3r::ZERO;
        self.yaw_rate = 0.0;
    }

    fn step(&mut self, dt: f32, config: &MockConfig) {
        if dt <= 0.0 {
            return;
        }
        let mut done = false;
        match self.maneuver {
            Maneuver::Hold => {
                self.velocity = Vector3r::ZERO;
                self.yaw_rate = 0.0;
            }
            Maneuver::MoveTo { target, speed } => {
                done = self.advance_towards(target, speed, dt);
            }
            Maneuver::Velocity {
                velocity,
                remaining_s,
            } => {
                let used = dt.min(remaining_s);
                self.velocity = velocity;
                self.position = self.position + velocity * used;
                let left = remaining_s - dt;
                if left <= TIMED_EPS_S {
                    done = true;
                } else {
                    self.maneuver = Maneuver::Velocity {
                        velocity,
                        remaining_s: left,
                    };
                }
            }
            Maneuver::YawRate { rate, remaining_s } => {
                let used = dt.min(remaining_s);
                self.yaw_rate = rate;
                self.yaw = wrap_angle(self.yaw + rate * used);
                let left = remaining_s - dt;
                if left <= TIMED_EPS_S {
                    done = true;
                } else {
                    self.maneuver = Maneuver::YawRate {
                        rate,
                        remaining_s: left,
                    };
                }
            }
            Maneuver::YawTo { target } => {
                let diff = wrap_angle(target - self.yaw);
                let max_step = YAW_TO_RATE_RAD_S * dt;
                if diff.abs() <= max_step {
                    self.yaw = target;
                    done = true;
                } else {
                    self.yaw_rate = YAW_TO_RATE_RAD_S * diff.signum();
                    self.yaw = wrap_angle(self.yaw + max_step * diff.signum());
                }
            }
            Maneuver::Climb { target_z } => {
                let target = Vector3r::new(self.position.x, self.position.y, target_z);
                done = self.advance_towards(target, config.vertical_speed_m_s, dt);
            }
            Maneuver::Land => {
                let target = Vector3r::new(self.position.x, self.position.y, GROUND_Z);
                done = self.advance_towards(target, config.vertical_speed_m_s, dt);
                if done {
                    self.landed = LandedState::Landed;
                }
            }
        }

        if self.position.z > GROUND_Z {
            self.position.z = GROUND_Z;
            self.velocity.z = self.velocity.z.min(0.0);
        }
        if self.position.z < GROUND_Z - AIRBORNE_EPS {
            self.landed = LandedState::Flying;
        }
        if done {
            self.complete();
        }
    }

    fn advance_towards(&mut self, target: Vector3r, speed: f32, dt: f32) -> bool {
        let delta = target - self.position;
        let dist = delta.norm();
        let step = speed * dt;
        if dist <= step.max(ARRIVAL_EPS) {
            self.position = target;
            return true;
        }
        let dir = delta * (1.0 / dist);
        self.position = self.position + dir * step;
        self.velocity = dir * speed;
        false
    }

    fn snapshot(&self) -> MultirotorState {
        MultirotorState {
            kinematics: Kinematics {
                position: self.position,
                orientation: to_quaternion(0.0, 0.0, self.yaw),
                linear_velocity: self.velocity,
                angular_velocity: Vector3r::new(0.0, 0.0, self.yaw_rate),
            },
            landed_state: self.landed,
            armed: self.armed,
            api_control: self.api_control,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

struct Inner {
    config: MockConfig,
    state: Mutex<SimState>,
    running: AtomicBool,
}

impl Inner {
    /// Run a maneuver command; requires API control and armed motors.
    fn command(&self, f: impl FnOnce(&mut SimState) -> Task) -> Result<Task> {
        let mut state = self.state.lock();
        if !state.api_control {
            return Err(SimError::ApiControlDisabled);
        }
        if !state.armed {
            return Err(SimError::NotArmed);
        }
        Ok(f(&mut state))
    }
}

/// In-process kinematic quadrotor simulator.
///
/// [`MockMultirotor::new`] runs a stepping thread that advances simulated
/// time by `tick * time_scale` every `tick`. [`MockMultirotor::manual`] has no
/// thread; drive it with [`MockMultirotor::advance`].
pub struct MockMultirotor {
    inner: Arc<Inner>,
    stepper: Option<JoinHandle<()>>,
}

impl MockMultirotor {
    pub fn new(config: MockConfig) -> Result<Self> {
        let mut sim = Self::manual(config)?;
        let inner = Arc::clone(&sim.inner);
        inner.running.store(true, Ordering::Release);
        let handle = thread::Builder::new()
            .name("mock-sim".to_string())
            .spawn(move || {
                let tick = inner.config.tick;
                let dt = tick.as_secs_f32() * inner.config.time_scale;
                while inner.running.load(Ordering::Acquire) {
                    thread::sleep(tick);
                    inner.state.lock().step(dt, &inner.config);
                }
            })
            .map_err(|e| SimError::Io(e.to_string()))?;
        sim.stepper = Some(handle);
        Ok(sim)
    }

    pub fn manual(config: MockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(SimState::new()),
                running: AtomicBool::new(false),
            }),
            stepper: None,
        })
    }

    /// Advance simulated time by `dt` (not scaled by `time_scale`).
    pub fn advance(&self, dt: Duration) {
        self.inner
            .state
            .lock()
            .step(dt.as_secs_f32(), &self.inner.config);
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    fn render(&self, request: &ImageRequest, state: &SimState) -> ImageResponse {
        let (w, h) = (self.inner.config.image_width, self.inner.config.image_height);
        let shift = (state.position.x.abs() * 8.0) as u32 + (state.position.y.abs() * 8.0) as u32;
        let heading = (((state.yaw + PI) / (2.0 * PI)) * 255.0) as u8;
        let altitude = (-state.position.z).max(0.0);

        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for py in 0..h {
            for px in 0..w {
                let rgb = match request.image_type {
                    ImageType::Scene => [
                        (((px + shift) % w) * 255 / w) as u8,
                        (py * 255 / h) as u8,
                        heading,
                    ],
                    ImageType::Segmentation => {
                        let idx = (((px + shift) / 16 + py / 16) % 4) as usize;
                        SEGMENT_PALETTE[idx]
                    }
                    ImageType::DepthPlanar => {
                        let v = (altitude * 10.0).min(255.0) as u8;
                        [v, v, v]
                    }
                };
                data.extend_from_slice(&rgb);
            }
        }

        ImageResponse {
            camera_name: request.camera_name.clone(),
            image_type: request.image_type,
            width: w,
            height: h,
            data,
            compressed: false,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

impl Drop for MockMultirotor {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::Release);
        if let Some(handle) = self.stepper.take() {
            let _ = handle.join();
        }
        self.inner.state.lock().interrupt(TaskOutcome::Cancelled);
    }
}

fn check_finite(values: &[f32], what: &'static str) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SimError::InvalidArgument(what))
    }
}

impl MultirotorClient for MockMultirotor {
    fn confirm_connection(&self) -> Result<()> {
        debug!("mock-sim: connection confirmed");
        Ok(())
    }

    fn enable_api_control(&self, enabled: bool) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.api_control = enabled;
        if !enabled {
            state.interrupt(TaskOutcome::Cancelled);
        }
        Ok(())
    }

    fn arm_disarm(&self, arm: bool) -> Result<bool> {
        let mut state = self.inner.state.lock();
        if !state.api_control {
            return Err(SimError::ApiControlDisabled);
        }
        state.armed = arm;
        if !arm {
            state.interrupt(TaskOutcome::Cancelled);
        }
        Ok(state.armed)
    }

    fn takeoff(&self) -> Result<Task> {
        let altitude = self.inner.config.takeoff_altitude_m;
        self.inner.command(|state| {
            let target_z = state.position.z.min(-altitude);
            state.start(Maneuver::Climb { target_z })
        })
    }

    fn land(&self) -> Result<Task> {
        self.inner.command(|state| state.start(Maneuver::Land))
    }

    fn hover(&self) -> Result<Task> {
        self.inner.command(|state| {
            state.interrupt(TaskOutcome::Preempted);
            Task::completed(state.next_id())
        })
    }

    fn move_to_position(&self, x: f32, y: f32, z: f32, velocity: f32) -> Result<Task> {
        check_finite(&[x, y, z], "target must be finite")?;
        if !(velocity > 0.0) || !velocity.is_finite() {
            return Err(SimError::InvalidArgument("velocity must be positive"));
        }
        let target = Vector3r::new(x, y, z.min(GROUND_Z));
        self.inner.command(|state| {
            state.start(Maneuver::MoveTo {
                target,
                speed: velocity,
            })
        })
    }

    fn move_by_velocity(&self, vx: f32, vy: f32, vz: f32, duration_s: f32) -> Result<Task> {
        check_finite(&[vx, vy, vz, duration_s], "velocity must be finite")?;
        if duration_s < 0.0 {
            return Err(SimError::InvalidArgument("duration must not be negative"));
        }
        self.inner.command(|state| {
            state.start(Maneuver::Velocity {
                velocity: Vector3r::new(vx, vy, vz),
                remaining_s: duration_s,
            })
        })
    }

    fn rotate_by_yaw_rate(&self, rate_deg_s: f32, duration_s: f32) -> Result<Task> {
        check_finite(&[rate_deg_s, duration_s], "yaw rate must be finite")?;
        if duration_s < 0.0 {
            return Err(SimError::InvalidArgument("duration must not be negative"));
        }
        self.inner.command(|state| {
            state.start(Maneuver::YawRate {
                rate: rate_deg_s.to_radians(),
                remaining_s: duration_s,
            })
        })
    }

    fn rotate_to_yaw(&self, yaw_deg: f32) -> Result<Task> {
        check_finite(&[yaw_deg], "yaw must be finite")?;
        let target = wrap_angle(yaw_deg.to_radians());
        self.inner
            .command(|state| state.start(Maneuver::YawTo { target }))
    }

    fn cancel_last_task(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        if !state.api_control {
            return Err(SimError::ApiControlDisabled);
        }
        state.interrupt(TaskOutcome::Cancelled);
        Ok(())
    }

    fn multirotor_state(&self) -> Result<MultirotorState> {
        Ok(self.inner.state.lock().snapshot())
    }

    fn sim_get_images(&self, requests: &[ImageRequest]) -> Result<Vec<ImageResponse>> {
        let state = self.inner.state.lock();
        Ok(requests.iter().map(|r| self.render(r, &state)).collect())
    }
}
