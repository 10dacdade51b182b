use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use super::config::{clamp_capacity, ExecutorConfig};
use super::task_executor::{Task, TaskExecutor};
use crate::types::types::DeliveryError;

#[derive(Clone)]
enum TaskSender {
    Unbounded(mpsc::UnboundedSender<Task>),
    Bounded(mpsc::Sender<Task>),
}

enum TaskReceiver {
    Unbounded(mpsc::UnboundedReceiver<Task>),
    Bounded(mpsc::Receiver<Task>),
}

impl TaskReceiver {
    async fn recv(&mut self) -> Option<Task> {
        match self {
            Self::Unbounded(rx) => rx.recv().await,
            Self::Bounded(rx) => rx.recv().await,
        }
    }

    fn blocking_recv(&mut self) -> Option<Task> {
        match self {
            Self::Unbounded(rx) => rx.blocking_recv(),
            Self::Bounded(rx) => rx.blocking_recv(),
        }
    }

    fn try_recv(&mut self) -> Result<Task, TryRecvError> {
        match self {
            Self::Unbounded(rx) => rx.try_recv(),
            Self::Bounded(rx) => rx.try_recv(),
        }
    }
}

/// Creates a consumption context: the producer half, to be injected into
/// `DownloadDelivery`, and the `TaskLoop` that drains it.
///
/// The queue is FIFO and drained by exactly one loop, so tasks run one at a
/// time in submission order.
pub fn task_channel(config: &ExecutorConfig) -> (ChannelExecutor, TaskLoop) {
    let (tx, rx) = match config.capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(clamp_capacity(capacity));
            (TaskSender::Bounded(tx), TaskReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (TaskSender::Unbounded(tx), TaskReceiver::Unbounded(rx))
        }
    };

    let name: Arc<str> = Arc::from(config.name.as_str());
    (
        ChannelExecutor {
            tx,
            name: Arc::clone(&name),
        },
        TaskLoop { rx, name },
    )
}

/// Submits tasks to a `TaskLoop`. Cheap to clone; the loop stops once every
/// clone is dropped.
#[derive(Clone)]
pub struct ChannelExecutor {
    tx: TaskSender,
    name: Arc<str>,
}

impl ChannelExecutor {
    /// True once the matching `TaskLoop` has been dropped.
    pub fn is_closed(&self) -> bool {
        match &self.tx {
            TaskSender::Unbounded(tx) => tx.is_closed(),
            TaskSender::Bounded(tx) => tx.is_closed(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TaskExecutor for ChannelExecutor {
    fn execute(&self, task: Task) -> Result<(), DeliveryError> {
        match &self.tx {
            TaskSender::Unbounded(tx) => tx.send(task).map_err(|_| DeliveryError::ExecutorClosed),
            TaskSender::Bounded(tx) => tx.try_send(task).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::QueueFull,
                TrySendError::Closed(_) => DeliveryError::ExecutorClosed,
            }),
        }
    }
}

/// The consumption context: drains the task queue and runs each task.
///
/// Pick whichever driver matches the host:
/// - `run` on an async task,
/// - `run_blocking` / `spawn_thread` on a dedicated OS thread,
/// - `run_pending` from an existing event loop that pumps the queue.
///
/// A panicking task unwinds through the driver; nothing here catches it.
pub struct TaskLoop {
    rx: TaskReceiver,
    name: Arc<str>,
}

impl TaskLoop {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs tasks until every `ChannelExecutor` is dropped. Returns the number
    /// of tasks executed.
    pub async fn run(mut self) -> usize {
        let mut executed = 0;
        while let Some(task) = self.rx.recv().await {
            task();
            executed += 1;
        }
        log::debug!("[TaskLoop:{}] closed after {} tasks", self.name, executed);
        executed
    }

    /// Same as `run`, parking the current thread between tasks.
    ///
    /// Must not be called from inside an async runtime.
    pub fn run_blocking(mut self) -> usize {
        let mut executed = 0;
        while let Some(task) = self.rx.blocking_recv() {
            task();
            executed += 1;
        }
        log::debug!("[TaskLoop:{}] closed after {} tasks", self.name, executed);
        executed
    }

    /// Runs whatever is queued right now and returns without waiting.
    pub fn run_pending(&mut self) -> usize {
        let mut executed = 0;
        loop {
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        if executed > 0 {
            log::trace!("[TaskLoop:{}] ran {} pending tasks", self.name, executed);
        }
        executed
    }

    /// Moves the loop onto a new thread named after the config. The handle
    /// yields the number of tasks executed once all executors are dropped.
    pub fn spawn_thread(self) -> Result<JoinHandle<usize>, DeliveryError> {
        let name = self.name.to_string();
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || self.run_blocking())?;
        Ok(handle)
    }
}
