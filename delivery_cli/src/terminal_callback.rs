use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use delivery_core::{DownloadCallback, DownloadId};

/// Renders deliveries as indicatif terminal bars, one per download.
///
/// Runs on the consumption context, so bars are only ever touched from one
/// place at a time; the mutex is there because the trait requires `Sync`.
pub struct TerminalCallback {
    multi: MultiProgress,
    /// download id → ProgressBar (created on `on_start` or first progress)
    bars: Mutex<HashMap<DownloadId, ProgressBar>>,
}

impl TerminalCallback {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn with_bar(&self, id: DownloadId, total_bytes: Option<u64>, f: impl FnOnce(&ProgressBar)) {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = bars.entry(id).or_insert_with(|| {
            let style = ProgressStyle::with_template(
                "{prefix} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) — {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-");

            let pb = self.multi.add(ProgressBar::new(total_bytes.unwrap_or(0).max(1)));
            pb.set_style(style);
            pb.set_prefix(format!("[download {}]", id));
            pb
        });
        f(bar);
    }
}

impl DownloadCallback for TerminalCallback {
    fn on_start(&self, id: DownloadId, total_bytes: u64) {
        self.with_bar(id, Some(total_bytes), |pb| {
            pb.set_length(total_bytes.max(1));
            pb.set_message("started");
        });
    }

    fn on_retry(&self, id: DownloadId) {
        self.with_bar(id, None, |pb| {
            pb.set_position(0);
            pb.set_message("retrying");
        });
    }

    fn on_progress(&self, id: DownloadId, bytes_written: u64, total_bytes: Option<u64>) {
        self.with_bar(id, total_bytes, |pb| {
            if let Some(total) = total_bytes {
                pb.set_length(total.max(1));
            }
            pb.set_position(bytes_written);
            pb.set_message("downloading");
        });
    }

    fn on_success(&self, id: DownloadId, destination_path: &Path) {
        self.with_bar(id, None, |pb| {
            let written = format_bytes(pb.position());
            pb.finish_with_message(format!("{} saved to {}", written, destination_path.display()));
        });
    }

    fn on_failure(&self, id: DownloadId, status_code: i32, message: &str) {
        self.with_bar(id, None, |pb| {
            pb.abandon_with_message(format!("failed ({}): {}", status_code, message));
        });
    }
}

/// Scales a byte count to B/KB/MB/GB for summaries and bar messages.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut scaled = bytes as f64;
    let mut unit = 0;
    while scaled >= 1024.0 && unit + 1 < UNITS.len() {
        scaled /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{} B", bytes),
        1 => format!("{:.1} KB", scaled),
        _ => format!("{:.2} {}", scaled, UNITS[unit]),
    }
}
