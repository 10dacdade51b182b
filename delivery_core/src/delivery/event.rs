use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::callback::DownloadCallback;
use crate::types::types::{DownloadId, DownloadRequest};

/// One lifecycle event as it reaches a callback.
///
/// Serializable so it can be forwarded to other transports (SSE, logs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryEvent {
    Start {
        id: DownloadId,
        total_bytes: u64,
    },
    Retry {
        id: DownloadId,
    },
    Progress {
        id: DownloadId,
        bytes_written: u64,
        total_bytes: Option<u64>,
    },
    Success {
        id: DownloadId,
        destination_path: PathBuf,
    },
    Failure {
        id: DownloadId,
        status_code: i32,
        message: String,
    },
}

impl DeliveryEvent {
    pub fn id(&self) -> DownloadId {
        match self {
            Self::Start { id, .. }
            | Self::Retry { id }
            | Self::Progress { id, .. }
            | Self::Success { id, .. }
            | Self::Failure { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Retry { .. } => EventKind::Retry,
            Self::Progress { .. } => EventKind::Progress,
            Self::Success { .. } => EventKind::Success,
            Self::Failure { .. } => EventKind::Failure,
        }
    }

    /// Invokes the callback method matching this event.
    pub fn dispatch_to(&self, callback: &dyn DownloadCallback) {
        match self {
            Self::Start { id, total_bytes } => callback.on_start(*id, *total_bytes),
            Self::Retry { id } => callback.on_retry(*id),
            Self::Progress {
                id,
                bytes_written,
                total_bytes,
            } => callback.on_progress(*id, *bytes_written, *total_bytes),
            Self::Success {
                id,
                destination_path,
            } => callback.on_success(*id, destination_path),
            Self::Failure {
                id,
                status_code,
                message,
            } => callback.on_failure(*id, *status_code, message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    Retry,
    Progress,
    Success,
    Failure,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Retry => "retry",
            Self::Progress => "progress",
            Self::Success => "success",
            Self::Failure => "failure",
        };
        f.write_str(name)
    }
}

/// Payload captured when a worker posts an event. The success path is not
/// part of it: it is read from the request when the delivery executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeliveryPayload {
    Start {
        total_bytes: u64,
    },
    Retry,
    Progress {
        bytes_written: u64,
        total_bytes: Option<u64>,
    },
    Success,
    Failure {
        status_code: i32,
        message: String,
    },
}

impl DeliveryPayload {
    pub(crate) fn kind(&self) -> EventKind {
        match self {
            Self::Start { .. } => EventKind::Start,
            Self::Retry => EventKind::Retry,
            Self::Progress { .. } => EventKind::Progress,
            Self::Success => EventKind::Success,
            Self::Failure { .. } => EventKind::Failure,
        }
    }
}

/// A queued delivery: the originating request plus what was posted.
#[derive(Debug)]
pub(crate) struct PendingDelivery {
    pub(crate) request: Arc<DownloadRequest>,
    pub(crate) id: DownloadId,
    pub(crate) payload: DeliveryPayload,
}

impl PendingDelivery {
    /// Builds the event the callback will see, reading request state as it
    /// is right now. `None` when a success has no destination path.
    pub(crate) fn resolve(self) -> Option<DeliveryEvent> {
        let id = self.id;
        let event = match self.payload {
            DeliveryPayload::Start { total_bytes } => DeliveryEvent::Start { id, total_bytes },
            DeliveryPayload::Retry => DeliveryEvent::Retry { id },
            DeliveryPayload::Progress {
                bytes_written,
                total_bytes,
            } => DeliveryEvent::Progress {
                id,
                bytes_written,
                total_bytes,
            },
            DeliveryPayload::Success => DeliveryEvent::Success {
                id,
                destination_path: self.request.destination_path()?,
            },
            DeliveryPayload::Failure {
                status_code,
                message,
            } => DeliveryEvent::Failure {
                id,
                status_code,
                message,
            },
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_resolves_path_at_resolution_time() {
        let request = Arc::new(DownloadRequest::with_id(DownloadId::new(3)));
        let pending = PendingDelivery {
            request: Arc::clone(&request),
            id: DownloadId::new(3),
            payload: DeliveryPayload::Success,
        };

        request.set_destination_path("/downloads/late.bin");

        assert_eq!(
            pending.resolve(),
            Some(DeliveryEvent::Success {
                id: DownloadId::new(3),
                destination_path: PathBuf::from("/downloads/late.bin"),
            })
        );
    }

    #[test]
    fn test_success_without_path_resolves_to_none() {
        let pending = PendingDelivery {
            request: Arc::new(DownloadRequest::with_id(DownloadId::new(4))),
            id: DownloadId::new(4),
            payload: DeliveryPayload::Success,
        };
        assert_eq!(pending.resolve(), None);
    }

    #[test]
    fn test_event_serializes_with_kind_tag() {
        let event = DeliveryEvent::Progress {
            id: DownloadId::new(9),
            bytes_written: 512,
            total_bytes: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "kind": "progress",
                "id": 9,
                "bytes_written": 512,
                "total_bytes": null,
            })
        );
    }

    #[test]
    fn test_payload_kind_matches_event_kind() {
        let pending = PendingDelivery {
            request: Arc::new(DownloadRequest::with_id(DownloadId::new(5))),
            id: DownloadId::new(5),
            payload: DeliveryPayload::Failure {
                status_code: 500,
                message: "boom".to_string(),
            },
        };
        let kind = pending.payload.kind();
        assert_eq!(pending.resolve().map(|e| e.kind()), Some(kind));
    }
}
