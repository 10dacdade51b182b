pub mod config;
pub mod task_executor;
pub mod task_loop;

pub use config::{ExecutorConfig, ExecutorConfigBuilder, MAX_CAPACITY};
pub use task_executor::{ImmediateExecutor, Task, TaskExecutor};
pub use task_loop::{task_channel, ChannelExecutor, TaskLoop};
