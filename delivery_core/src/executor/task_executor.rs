use std::sync::{Mutex, PoisonError};

use crate::types::types::DeliveryError;

/// A zero-argument unit of work bound for the consumption context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Capability to submit work to a consumption context.
///
/// Implementations must run accepted tasks later, exactly once, one at a time
/// and in the order they were submitted. `execute` must not block on the task
/// itself.
pub trait TaskExecutor: Send + Sync {
    fn execute(&self, task: Task) -> Result<(), DeliveryError>;
}

/// Runs every task inline on the submitting thread.
///
/// Submissions from several threads are serialized by a guard, so tasks
/// still run one at a time. A task must not submit to the same
/// `ImmediateExecutor`: the guard is held while it runs.
#[derive(Debug, Default)]
pub struct ImmediateExecutor {
    guard: Mutex<()>,
}

impl ImmediateExecutor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TaskExecutor for ImmediateExecutor {
    fn execute(&self, task: Task) -> Result<(), DeliveryError> {
        let _running = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        task();
        Ok(())
    }
}
