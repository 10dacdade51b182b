use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use delivery_core::{DeliveryError, DownloadDelivery, DownloadRequest};

/// How long a worker waits before re-posting into a full bounded queue.
const QUEUE_FULL_BACKOFF: Duration = Duration::from_millis(5);

/// Status code reported by a worker told to fail.
const SIMULATED_FAILURE_CODE: i32 = 503;

/// Plays the part of a download worker: no network, just a timed sequence of
/// lifecycle events posted through `DownloadDelivery` from its own thread.
pub struct SimulatedWorker {
    pub request: Arc<DownloadRequest>,
    pub chunks: u64,
    pub chunk_size: u64,
    pub retries: usize,
    pub chunk_delay: Duration,
    pub destination: PathBuf,
    /// Fail after this many chunks instead of finishing.
    pub fail_after: Option<u64>,
    /// Detach the callback after this many chunks.
    pub detach_after: Option<u64>,
}

impl SimulatedWorker {
    pub fn run(self, delivery: DownloadDelivery) -> Result<(), DeliveryError> {
        let total_bytes = self.chunks.saturating_mul(self.chunk_size);

        for _ in 0..self.retries {
            post_with_backoff(|| delivery.post_retry(&self.request))?;
            thread::sleep(self.chunk_delay);
        }

        post_with_backoff(|| delivery.post_start(&self.request, total_bytes))?;

        let mut written = 0;
        for chunk in 1..=self.chunks {
            thread::sleep(self.chunk_delay);
            written = self.chunk_size.saturating_add(written);
            post_with_backoff(|| delivery.post_progress(&self.request, written, Some(total_bytes)))?;

            if self.detach_after == Some(chunk) {
                log::info!("detaching callback after chunk {}", chunk);
                self.request.detach_callback();
            }
            if self.fail_after == Some(chunk) {
                return post_with_backoff(|| {
                    delivery.post_failure(
                        &self.request,
                        SIMULATED_FAILURE_CODE,
                        format!("simulated failure after {} bytes", written),
                    )
                });
            }
        }

        self.request.set_destination_path(self.destination.clone());
        post_with_backoff(|| delivery.post_success(&self.request))
    }
}

/// Re-posts while a bounded queue is full; any other error is returned.
fn post_with_backoff(mut post: impl FnMut() -> Result<(), DeliveryError>) -> Result<(), DeliveryError> {
    loop {
        match post() {
            Err(DeliveryError::QueueFull) => thread::sleep(QUEUE_FULL_BACKOFF),
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delivery_core::{
        task_channel, ChannelCallback, DeliveryEvent, DownloadId, EventKind, ExecutorConfig,
        ImmediateExecutor,
    };

    fn make_worker(id: u64, callback: ChannelCallback) -> SimulatedWorker {
        SimulatedWorker {
            request: Arc::new(
                DownloadRequest::with_id(DownloadId::new(id)).with_callback(Arc::new(callback)),
            ),
            chunks: 4,
            chunk_size: 10,
            retries: 1,
            chunk_delay: Duration::ZERO,
            destination: PathBuf::from("/downloads/sim.bin"),
            fail_after: None,
            detach_after: None,
        }
    }

    fn drain_kinds(rx: &mut tokio::sync::mpsc::UnboundedReceiver<DeliveryEvent>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        kinds
    }

    #[test]
    fn test_worker_reports_full_lifecycle() {
        let (callback, mut rx) = ChannelCallback::new();
        let worker = make_worker(1, callback);

        worker.run(DownloadDelivery::new(Arc::new(ImmediateExecutor::new()))).unwrap();

        assert_eq!(
            drain_kinds(&mut rx),
            vec![
                EventKind::Retry,
                EventKind::Start,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Success,
            ]
        );
    }

    #[test]
    fn test_worker_failure_stops_after_failure_event() {
        let (callback, mut rx) = ChannelCallback::new();
        let mut worker = make_worker(2, callback);
        worker.retries = 0;
        worker.fail_after = Some(2);

        worker.run(DownloadDelivery::new(Arc::new(ImmediateExecutor::new()))).unwrap();

        assert_eq!(
            drain_kinds(&mut rx),
            vec![
                EventKind::Start,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Failure,
            ]
        );
    }

    #[test]
    fn test_worker_detach_silences_remaining_events() {
        let (callback, mut rx) = ChannelCallback::new();
        let mut worker = make_worker(3, callback);
        worker.retries = 0;
        worker.detach_after = Some(1);

        worker.run(DownloadDelivery::new(Arc::new(ImmediateExecutor::new()))).unwrap();

        assert_eq!(drain_kinds(&mut rx), vec![EventKind::Start, EventKind::Progress]);
    }

    #[test]
    fn test_worker_byte_counts_saturate() {
        let (callback, mut rx) = ChannelCallback::new();
        let mut worker = make_worker(5, callback);
        worker.retries = 0;
        worker.chunks = 3;
        worker.chunk_size = u64::MAX / 2;

        worker.run(DownloadDelivery::new(Arc::new(ImmediateExecutor::new()))).unwrap();

        let mut totals = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                DeliveryEvent::Start { total_bytes, .. } => totals.push(total_bytes),
                DeliveryEvent::Progress { bytes_written, .. } => totals.push(bytes_written),
                _ => {}
            }
        }
        assert_eq!(totals, vec![u64::MAX, u64::MAX / 2, u64::MAX - 1, u64::MAX]);
    }

    #[test]
    fn test_worker_backs_off_on_full_queue() {
        let config = ExecutorConfig::builder().with_capacity(1).build();
        let (executor, task_loop) = task_channel(&config);
        let consumer = task_loop.spawn_thread().unwrap();

        let (callback, mut rx) = ChannelCallback::new();
        let worker = make_worker(4, callback);
        worker.run(DownloadDelivery::new(Arc::new(executor))).unwrap();

        assert_eq!(consumer.join().unwrap(), 7);
        assert_eq!(drain_kinds(&mut rx).len(), 7);
    }
}
