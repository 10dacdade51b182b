use std::path::Path;

use tokio::sync::mpsc;

use super::event::DeliveryEvent;
use crate::types::types::DownloadId;

/// Trait for anything that wants to hear about a download's lifecycle.
///
/// `DownloadDelivery` invokes these methods on the consumption context, one
/// delivery at a time and in the order the worker posted them. Every method
/// has an empty default body; implement only the events you care about.
///
/// Lifecycle:
/// - `on_start` once the worker knows the total size.
/// - `on_retry` each time the worker starts another attempt.
/// - `on_progress` for every chunk reported (`total_bytes` is `None` when the
///   length is unknown).
/// - `on_success` once, with the path the file was written to.
/// - `on_failure` once, with the worker's status code and message as-is.
pub trait DownloadCallback: Send + Sync + 'static {
    fn on_start(&self, _id: DownloadId, _total_bytes: u64) {}

    fn on_retry(&self, _id: DownloadId) {}

    fn on_progress(&self, _id: DownloadId, _bytes_written: u64, _total_bytes: Option<u64>) {}

    fn on_success(&self, _id: DownloadId, _destination_path: &Path) {}

    fn on_failure(&self, _id: DownloadId, _status_code: i32, _message: &str) {}
}

/// Forwards every delivery as a `DeliveryEvent` into a channel, so async
/// code can `recv().await` them instead of implementing the trait.
pub struct ChannelCallback {
    tx: mpsc::UnboundedSender<DeliveryEvent>,
}

impl ChannelCallback {
    /// Creates a new callback and returns the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DeliveryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: DeliveryEvent) {
        // send() only fails once the receiver is gone; nobody is listening then.
        if self.tx.send(event).is_err() {
            log::trace!("[ChannelCallback] receiver dropped, discarding event");
        }
    }
}

impl DownloadCallback for ChannelCallback {
    fn on_start(&self, id: DownloadId, total_bytes: u64) {
        self.forward(DeliveryEvent::Start { id, total_bytes });
    }

    fn on_retry(&self, id: DownloadId) {
        self.forward(DeliveryEvent::Retry { id });
    }

    fn on_progress(&self, id: DownloadId, bytes_written: u64, total_bytes: Option<u64>) {
        self.forward(DeliveryEvent::Progress {
            id,
            bytes_written,
            total_bytes,
        });
    }

    fn on_success(&self, id: DownloadId, destination_path: &Path) {
        self.forward(DeliveryEvent::Success {
            id,
            destination_path: destination_path.to_path_buf(),
        });
    }

    fn on_failure(&self, id: DownloadId, status_code: i32, message: &str) {
        self.forward(DeliveryEvent::Failure {
            id,
            status_code,
            message: message.to_string(),
        });
    }
}
