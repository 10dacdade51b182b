//! Delivers download lifecycle events from worker threads to one serial
//! consumption context.
//!
//! Workers call `DownloadDelivery::post_*` from whatever thread they run on.
//! Each call becomes a task on the injected `TaskExecutor`; the consumption
//! context (usually a `TaskLoop` obtained from `task_channel`) runs the tasks
//! one at a time, in submission order, and invokes the request's
//! `DownloadCallback`.

pub mod delivery;
pub mod executor;
pub mod types;

pub use delivery::{ChannelCallback, DeliveryEvent, DownloadCallback, DownloadDelivery, EventKind};
pub use executor::{
    task_channel, ChannelExecutor, ExecutorConfig, ImmediateExecutor, Task, TaskExecutor, TaskLoop,
};
pub use types::types::{DeliveryError, DownloadId, DownloadRequest};
