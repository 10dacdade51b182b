use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::delivery::callback::DownloadCallback;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The caller handed over something no delivery can be built from.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The consumption context has shut down; nothing will drain the queue.
    #[error("consumption context has shut down")]
    ExecutorClosed,

    /// A bounded task queue has no free slot.
    #[error("delivery queue is full")]
    QueueFull,

    #[error("failed to start consumption thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Process-wide counter backing `DownloadId::next()`. Starts at 1 so that a
/// zero id never shows up in logs for a generated download.
static NEXT_DOWNLOAD_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier of one download session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(u64);

impl DownloadId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Allocates a fresh id. Ids handed out here are never reused while the
    /// process is alive, so stale deliveries can't be confused with a newer
    /// download.
    pub fn next() -> Self {
        Self(NEXT_DOWNLOAD_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The request record shared between download workers and the consumption
/// context.
///
/// Workers hold it as `Arc<DownloadRequest>` and pass it to
/// `DownloadDelivery`; the queued delivery re-reads `callback()` and
/// `destination_path()` when it executes. Both fields sit behind an `RwLock`
/// so a write on any thread is visible to the consumption context.
pub struct DownloadRequest {
    id: OnceLock<DownloadId>,
    callback: RwLock<Option<Arc<dyn DownloadCallback>>>,
    destination_path: RwLock<Option<PathBuf>>,
}

impl DownloadRequest {
    /// A request without an id yet. It has to go through `assign_id` before
    /// any event can be posted for it.
    pub fn new() -> Self {
        Self {
            id: OnceLock::new(),
            callback: RwLock::new(None),
            destination_path: RwLock::new(None),
        }
    }

    pub fn with_id(id: DownloadId) -> Self {
        let request = Self::new();
        // A freshly built OnceLock is always empty.
        let _ = request.id.set(id);
        request
    }

    pub fn with_callback(self, callback: Arc<dyn DownloadCallback>) -> Self {
        self.attach_callback(callback);
        self
    }

    pub fn with_destination_path(self, path: impl Into<PathBuf>) -> Self {
        self.set_destination_path(path);
        self
    }

    /// Assigns the download id. An id is immutable once assigned, so a second
    /// call fails and leaves the original id in place.
    pub fn assign_id(&self, id: DownloadId) -> Result<(), DeliveryError> {
        self.id.set(id).map_err(|_| {
            DeliveryError::InvalidArgument(format!(
                "download id already assigned ({}), refusing {}",
                self.id.get().map(|current| current.get()).unwrap_or_default(),
                id
            ))
        })
    }

    pub fn download_id(&self) -> Option<DownloadId> {
        self.id.get().copied()
    }

    /// Attaches a callback, returning the one it replaces.
    pub fn attach_callback(
        &self,
        callback: Arc<dyn DownloadCallback>,
    ) -> Option<Arc<dyn DownloadCallback>> {
        let mut guard = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(callback)
    }

    /// Detaches the callback. Deliveries that are already queued but not yet
    /// executed become no-ops.
    pub fn detach_callback(&self) -> Option<Arc<dyn DownloadCallback>> {
        let mut guard = self.callback.write().unwrap_or_else(PoisonError::into_inner);
        guard.take()
    }

    /// Current callback, cloned out of the lock so the caller can invoke it
    /// without holding the lock (a callback may detach itself).
    pub fn callback(&self) -> Option<Arc<dyn DownloadCallback>> {
        let guard = self.callback.read().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    pub fn set_destination_path(&self, path: impl Into<PathBuf>) {
        let mut guard = self
            .destination_path
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(path.into());
    }

    pub fn destination_path(&self) -> Option<PathBuf> {
        let guard = self
            .destination_path
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }
}

impl Default for DownloadRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DownloadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadRequest")
            .field("id", &self.download_id())
            .field("has_callback", &self.callback().is_some())
            .field("destination_path", &self.destination_path())
            .finish()
    }
}
