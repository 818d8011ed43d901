use crate::{plan, CancelToken, Completion, DroneController, FlightError, PilotMetrics, Result};
use intent_matcher::DroneCommand;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub type CommandId = Uuid;

struct Worker {
    id: CommandId,
    command: DroneCommand,
    token: CancelToken,
    handle: JoinHandle<Option<Completion>>,
}

impl Worker {
    /// Wait for the worker; `None` if it failed or panicked.
    fn join(self, metrics: &PilotMetrics) -> Option<Completion> {
        match self.handle.join() {
            Ok(done) => done,
            Err(_) => {
                metrics.worker_failures.inc();
                error!("worker for {} ({}) panicked", self.command, self.id);
                None
            }
        }
    }
}

/// Runs each command on its own thread, one at a time. A new command cancels
/// the worker in flight and waits for it to exit before starting.
pub struct CommandExecutor {
    controller: Arc<DroneController>,
    metrics: Arc<PilotMetrics>,
    current: Mutex<Option<Worker>>,
    closed: AtomicBool,
}

impl CommandExecutor {
    pub fn new(controller: Arc<DroneController>, metrics: Arc<PilotMetrics>) -> Self {
        Self {
            controller,
            metrics,
            current: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn controller(&self) -> &Arc<DroneController> {
        &self.controller
    }

    pub fn dispatch(&self, command: DroneCommand) -> Result<CommandId> {
        let mut current = self.current.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(FlightError::ShutDown);
        }
        if let Some(prev) = current.take() {
            let (prev_command, prev_id) = (prev.command, prev.id);
            let running = !prev.handle.is_finished();
            prev.token.cancel();
            let done = prev.join(&self.metrics);
            // Run-to-completion maneuvers ignore the token and are merely waited for.
            if running && done.as_ref().is_some_and(Completion::is_interrupted) {
                info!("preempted {} ({})", prev_command, prev_id);
                self.metrics.preempted.inc();
            }
        }

        let id = Uuid::new_v4();
        let token = CancelToken::new();
        let maneuver = plan(command, self.controller.profile());
        let controller = Arc::clone(&self.controller);
        let metrics = Arc::clone(&self.metrics);
        let worker_token = token.clone();

        let handle = std::thread::Builder::new()
            .name(format!("drone-{}", command.label()))
            .spawn(move || match controller.execute(&maneuver, &worker_token) {
                Ok(done) => {
                    debug!("{} ({}) finished: {:?}", command, id, done);
                    Some(done)
                }
                Err(e) => {
                    metrics.worker_failures.inc();
                    warn!("{} ({}) failed: {}", command, id, e);
                    None
                }
            })
            .map_err(|e| FlightError::Spawn(e.to_string()))?;

        self.metrics.dispatched.inc();
        debug!("dispatched {} as {}", command, id);
        *current = Some(Worker {
            id,
            command,
            token,
            handle,
        });
        Ok(id)
    }

    /// Whether a worker is still running.
    pub fn is_busy(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// The command the latest worker was started for, if it is still running.
    pub fn current_command(&self) -> Option<DroneCommand> {
        self.current
            .lock()
            .as_ref()
            .filter(|w| !w.handle.is_finished())
            .map(|w| w.command)
    }

    /// Block until the current worker (if any) finishes on its own.
    pub fn wait_idle(&self) {
        if let Some(worker) = self.current.lock().take() {
            let _ = worker.join(&self.metrics);
        }
    }

    /// Cancel and join the current worker. Later dispatches fail.
    pub fn shutdown(&self) {
        let mut current = self.current.lock();
        self.closed.store(true, Ordering::Release);
        if let Some(worker) = current.take() {
            worker.token.cancel();
            let _ = worker.join(&self.metrics);
        }
    }
}

impl Drop for CommandExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MotionProfile;
    use sim_client::{MockConfig, MockMultirotor, MultirotorClient};
    use std::time::Duration;

    fn executor(profile: MotionProfile) -> (Arc<MockMultirotor>, CommandExecutor) {
        let sim = Arc::new(
            MockMultirotor::new(MockConfig {
                tick: Duration::from_millis(2),
                time_scale: 100.0,
                ..MockConfig::default()
            })
            .unwrap(),
        );
        sim.enable_api_control(true).unwrap();
        sim.arm_disarm(true).unwrap();
        let client: Arc<dyn MultirotorClient> = sim.clone();
        let controller = DroneController::new(client, profile, std::env::temp_dir()).unwrap();
        let metrics = Arc::new(PilotMetrics::new().unwrap());
        (sim, CommandExecutor::new(Arc::new(controller), metrics))
    }

    #[test]
    fn commands_run_in_order() {
        let (sim, ex) = executor(MotionProfile::keyword());
        ex.dispatch(DroneCommand::TakeOff).unwrap();
        ex.dispatch(DroneCommand::Up).unwrap();
        ex.wait_idle();
        assert!(!ex.is_busy());
        let z = sim.multirotor_state().unwrap().kinematics.position.z;
        // run-to-completion: takeoff to 3 m, then 4 m more
        assert!((z + 7.0).abs() < 1e-3, "z = {}", z);
        assert_eq!(ex.metrics.dispatched.get(), 2);
        assert_eq!(ex.metrics.preempted.get(), 0);
    }

    #[test]
    fn new_command_preempts_an_interruptible_one() {
        let (sim, ex) = executor(MotionProfile::similarity());
        ex.dispatch(DroneCommand::Forward).unwrap();
        std::thread::sleep(Duration::from_millis(30));
        assert!(ex.is_busy());
        assert_eq!(ex.current_command(), Some(DroneCommand::Forward));

        ex.dispatch(DroneCommand::Stop).unwrap();
        ex.wait_idle();
        assert_eq!(ex.metrics.preempted.get(), 1);
        let k = sim.multirotor_state().unwrap().kinematics;
        assert!(k.position.x > 0.0 && k.position.x < 500.0);
        assert_eq!(k.linear_velocity.norm(), 0.0);
    }

    #[test]
    fn takeoff_is_waited_for_not_preempted() {
        let (sim, ex) = executor(MotionProfile::similarity());
        ex.dispatch(DroneCommand::TakeOff).unwrap();
        ex.dispatch(DroneCommand::Stop).unwrap();
        ex.wait_idle();
        assert_eq!(ex.metrics.preempted.get(), 0);
        assert_eq!(ex.metrics.dispatched.get(), 2);
        let z = sim.multirotor_state().unwrap().kinematics.position.z;
        assert!((z + 3.0).abs() < 1e-3, "z = {}", z);
    }

    #[test]
    fn stop_while_idle_still_runs() {
        let (_sim, ex) = executor(MotionProfile::zero_shot());
        let first = ex.dispatch(DroneCommand::Stop).unwrap();
        ex.wait_idle();
        let second = ex.dispatch(DroneCommand::Stop).unwrap();
        ex.wait_idle();
        assert_ne!(first, second);
        assert_eq!(ex.metrics.worker_failures.get(), 0);
    }

    #[test]
    fn shutdown_refuses_new_commands() {
        let (_sim, ex) = executor(MotionProfile::similarity());
        ex.dispatch(DroneCommand::Forward).unwrap();
        ex.shutdown();
        assert!(!ex.is_busy());
        assert!(matches!(
            ex.dispatch(DroneCommand::Stop),
            Err(FlightError::ShutDown)
        ));
        assert_eq!(ex.metrics.dispatched.get(), 1);
    }

    #[test]
    fn worker_errors_are_counted_not_propagated() {
        let (sim, ex) = executor(MotionProfile::keyword());
        sim.arm_disarm(false).unwrap();
        ex.dispatch(DroneCommand::TakeOff).unwrap();
        ex.wait_idle();
        assert_eq!(ex.metrics.worker_failures.get(), 1);
    }
}
