use std::sync::Arc;

use super::event::{DeliveryPayload, PendingDelivery};
use crate::executor::task_executor::TaskExecutor;
use crate::types::types::{DeliveryError, DownloadRequest};

/// Hands download lifecycle events from worker threads to the consumption
/// context.
///
/// Every `post_*` call packs its payload into a `PendingDelivery` and submits
/// it to the injected `TaskExecutor`, then returns without waiting. When the
/// executor runs the task, `deliver` looks up the request's callback *at that
/// moment*: a callback detached in between is simply skipped.
///
/// | Method          | Callback invoked on the consumption context  |
/// |-----------------|----------------------------------------------|
/// | `post_start`    | `on_start(id, total_bytes)`                  |
/// | `post_retry`    | `on_retry(id)`                               |
/// | `post_progress` | `on_progress(id, bytes_written, total_bytes)`|
/// | `post_success`  | `on_success(id, destination_path)`           |
/// | `post_failure`  | `on_failure(id, status_code, message)`       |
#[derive(Clone)]
pub struct DownloadDelivery {
    executor: Arc<dyn TaskExecutor>,
}

impl DownloadDelivery {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self { executor }
    }

    pub fn post_start(
        &self,
        request: &Arc<DownloadRequest>,
        total_bytes: u64,
    ) -> Result<(), DeliveryError> {
        self.post(request, DeliveryPayload::Start { total_bytes })
    }

    pub fn post_retry(&self, request: &Arc<DownloadRequest>) -> Result<(), DeliveryError> {
        self.post(request, DeliveryPayload::Retry)
    }

    /// `total_bytes` is `None` when the worker doesn't know the length.
    pub fn post_progress(
        &self,
        request: &Arc<DownloadRequest>,
        bytes_written: u64,
        total_bytes: Option<u64>,
    ) -> Result<(), DeliveryError> {
        self.post(
            request,
            DeliveryPayload::Progress {
                bytes_written,
                total_bytes,
            },
        )
    }

    /// The destination path must be set on the request before this delivery
    /// executes; it is read from the request at that point.
    pub fn post_success(&self, request: &Arc<DownloadRequest>) -> Result<(), DeliveryError> {
        self.post(request, DeliveryPayload::Success)
    }

    /// `status_code` and `message` are passed through untouched.
    pub fn post_failure(
        &self,
        request: &Arc<DownloadRequest>,
        status_code: i32,
        message: impl Into<String>,
    ) -> Result<(), DeliveryError> {
        self.post(
            request,
            DeliveryPayload::Failure {
                status_code,
                message: message.into(),
            },
        )
    }

    fn post(
        &self,
        request: &Arc<DownloadRequest>,
        payload: DeliveryPayload,
    ) -> Result<(), DeliveryError> {
        let kind = payload.kind();
        let id = request.download_id().ok_or_else(|| {
            DeliveryError::InvalidArgument(format!(
                "cannot post {} event: download request has no id assigned",
                kind
            ))
        })?;

        let delivery = PendingDelivery {
            request: Arc::clone(request),
            id,
            payload,
        };

        log::debug!("[DownloadDelivery] posting {} for download {}", kind, id);
        self.executor
            .execute(Box::new(move || deliver(delivery)))
            .inspect_err(|e| {
                log::warn!(
                    "[DownloadDelivery] dropped {} for download {}: {}",
                    kind,
                    id,
                    e
                );
            })
    }
}

/// Runs on the consumption context.
fn deliver(delivery: PendingDelivery) {
    let id = delivery.id;
    let kind = delivery.payload.kind();

    let Some(callback) = delivery.request.callback() else {
        log::trace!("[DownloadDelivery] no callback for download {}, skipping {}", id, kind);
        return;
    };

    match delivery.resolve() {
        Some(event) => {
            log::debug!("[DownloadDelivery] delivering {} for download {}", kind, id);
            event.dispatch_to(callback.as_ref());
        }
        None => log::warn!(
            "[DownloadDelivery] download {} reported success without a destination path",
            id
        ),
    }
}
