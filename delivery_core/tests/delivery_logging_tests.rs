use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

use delivery_core::delivery::callback::DownloadCallback;
use delivery_core::delivery::dispatcher::DownloadDelivery;
use delivery_core::executor::config::ExecutorConfig;
use delivery_core::executor::task_loop::task_channel;
use delivery_core::types::types::{DownloadId, DownloadRequest};

/// Keeps every debug line in memory. Installed once for this test binary.
struct CapturingLogger {
    lines: Mutex<Vec<String>>,
}

impl Log for CapturingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.lines.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger {
    lines: Mutex::new(Vec::new()),
};

struct Silent;

impl DownloadCallback for Silent {}

fn lines_mentioning(id: DownloadId) -> Vec<String> {
    let suffix = format!("download {}", id);
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|line| line.ends_with(&suffix))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------
// Submission and execution both leave a debug line
// ---------------------------------------------------------------

#[test]
fn test_post_and_execution_are_logged() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Debug);

    let (executor, mut task_loop) = task_channel(&ExecutorConfig::default());
    let delivery = DownloadDelivery::new(Arc::new(executor));
    let id = DownloadId::new(9001);
    let request = Arc::new(DownloadRequest::with_id(id).with_callback(Arc::new(Silent)));

    delivery.post_start(&request, 42).unwrap();
    assert_eq!(lines_mentioning(id), vec!["[DownloadDelivery] posting start for download 9001"]);

    task_loop.run_pending();
    assert_eq!(
        lines_mentioning(id),
        vec![
            "[DownloadDelivery] posting start for download 9001",
            "[DownloadDelivery] delivering start for download 9001",
        ]
    );
}
