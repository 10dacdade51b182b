use serde::{Deserialize, Serialize};

/// Default thread name for a consumption context started with
/// `TaskLoop::spawn_thread`.
const DEFAULT_NAME: &str = "delivery";

/// Largest queue bound a channel accepts.
pub const MAX_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// A channel needs at least one slot and at most `MAX_CAPACITY`.
pub(crate) fn clamp_capacity(capacity: usize) -> usize {
    capacity.clamp(1, MAX_CAPACITY)
}

/// Settings for a channel-backed consumption context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Thread name used by `spawn_thread`, also shown in log lines.
    pub name: String,
    /// Maximum number of queued tasks. `None` means unbounded; with a bound,
    /// submissions beyond it fail with `DeliveryError::QueueFull`.
    pub capacity: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capacity: None,
        }
    }
}

impl ExecutorConfig {
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }
}

pub struct ExecutorConfigBuilder {
    config: ExecutorConfig,
}

impl ExecutorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Bounds the queue, clamped to `1..=MAX_CAPACITY`.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = Some(clamp_capacity(capacity));
        self
    }

    pub fn unbounded(mut self) -> Self {
        self.config.capacity = None;
        self
    }

    pub fn build(self) -> ExecutorConfig {
        self.config
    }
}

impl Default for ExecutorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
