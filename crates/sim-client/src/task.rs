use core::fmt;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// How a maneuver ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TaskOutcome {
    Completed,
    /// Stopped by `cancel_last_task` or by losing API control.
    Cancelled,
    /// Replaced by a newer maneuver.
    Preempted,
}

#[derive(Debug, Default)]
struct Shared {
    outcome: Mutex<Option<TaskOutcome>>,
    done: Condvar,
}

/// Handle to an asynchronous maneuver started on the simulator.
///
/// Clones share the same completion state. The backend resolves the task
/// exactly once; later calls to [`Task::resolve`] are ignored.
#[derive(Clone, Debug)]
pub struct Task {
    id: TaskId,
    shared: Arc<Shared>,
}

impl Task {
    pub fn pending(id: TaskId) -> Self {
        Self {
            id,
            shared: Arc::new(Shared::default()),
        }
    }

    /// A task that finished before it was handed out (e.g. hover).
    pub fn completed(id: TaskId) -> Self {
        let task = Self::pending(id);
        task.resolve(TaskOutcome::Completed);
        task
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_done(&self) -> bool {
        self.shared.outcome.lock().is_some()
    }

    pub fn outcome(&self) -> Option<TaskOutcome> {
        *self.shared.outcome.lock()
    }

    /// Record the outcome. Returns `false` if the task was already resolved.
    pub fn resolve(&self, outcome: TaskOutcome) -> bool {
        let mut slot = self.shared.outcome.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(outcome);
        self.shared.done.notify_all();
        true
    }

    /// Block until the task resolves.
    pub fn join(&self) -> TaskOutcome {
        let mut slot = self.shared.outcome.lock();
        loop {
            if let Some(outcome) = *slot {
                return outcome;
            }
            self.shared.done.wait(&mut slot);
        }
    }

    /// Block until the task resolves or `timeout` elapses.
    pub fn join_timeout(&self, timeout: Duration) -> Option<TaskOutcome> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.outcome.lock();
        loop {
            if let Some(outcome) = *slot {
                return Some(outcome);
            }
            if self.shared.done.wait_until(&mut slot, deadline).timed_out() {
                return *slot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn first_resolution_wins() {
        let task = Task::pending(TaskId(7));
        assert!(!task.is_done());
        assert!(task.resolve(TaskOutcome::Preempted));
        assert!(!task.resolve(TaskOutcome::Completed));
        assert_eq!(task.outcome(), Some(TaskOutcome::Preempted));
    }

    #[test]
    fn join_wakes_on_resolve_from_other_thread() {
        let task = Task::pending(TaskId(1));
        let remote = task.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.resolve(TaskOutcome::Completed);
        });
        assert_eq!(task.join(), TaskOutcome::Completed);
        handle.join().unwrap();
    }

    #[test]
    fn join_timeout_returns_none_while_pending() {
        let task = Task::pending(TaskId(2));
        assert_eq!(task.join_timeout(Duration::from_millis(10)), None);
        assert_eq!(
            Task::completed(TaskId(3)).join_timeout(Duration::ZERO),
            Some(TaskOutcome::Completed)
        );
    }
}
