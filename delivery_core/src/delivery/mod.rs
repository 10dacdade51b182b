pub mod callback;
pub mod dispatcher;
pub mod event;

pub use callback::{ChannelCallback, DownloadCallback};
pub use dispatcher::DownloadDelivery;
pub use event::{DeliveryEvent, EventKind};
