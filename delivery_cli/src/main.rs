use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;

use delivery_core::{task_channel, DownloadDelivery, DownloadId, DownloadRequest, ExecutorConfig};

mod simulated_worker;
mod terminal_callback;
use simulated_worker::SimulatedWorker;
use terminal_callback::{format_bytes, TerminalCallback};

#[derive(Parser)]
#[command(name = "dldemo", about = "Simulated downloads reporting through DownloadDelivery")]
struct Args {
    /// Number of concurrent simulated downloads
    #[arg(short, long, default_value = "3")]
    workers: usize,

    /// Chunks per download
    #[arg(long, default_value = "40")]
    chunks: u64,

    /// Bytes per chunk
    #[arg(long, default_value = "65536")]
    chunk_size: u64,

    /// Delay between chunks, in milliseconds
    #[arg(long, default_value = "25")]
    delay_ms: u64,

    /// Retries each worker reports before starting
    #[arg(long, default_value = "0")]
    retries: usize,

    /// Index of a worker that fails halfway
    #[arg(long)]
    fail: Option<usize>,

    /// Index of a worker whose callback is detached halfway
    #[arg(long)]
    detach: Option<usize>,

    /// Bound the delivery queue (unbounded when omitted)
    #[arg(long)]
    capacity: Option<usize>,

    /// Directory reported as the destination of finished downloads
    #[arg(short, long, default_value = "downloads")]
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = ExecutorConfig::builder().with_name("dldemo-delivery");
    if let Some(capacity) = args.capacity {
        config = config.with_capacity(capacity);
    }
    let (executor, task_loop) = task_channel(&config.build());
    let delivery = DownloadDelivery::new(Arc::new(executor));
    let terminal = Arc::new(TerminalCallback::new());

    let halfway = (args.chunks / 2).max(1);
    let mut workers = Vec::with_capacity(args.workers);
    for index in 0..args.workers {
        let id = DownloadId::next();
        let request = Arc::new(DownloadRequest::with_id(id).with_callback(terminal.clone()));
        let worker = SimulatedWorker {
            request,
            chunks: args.chunks,
            chunk_size: args.chunk_size,
            retries: args.retries,
            chunk_delay: Duration::from_millis(args.delay_ms),
            destination: args.output_dir.join(format!("download-{}.bin", id)),
            fail_after: (args.fail == Some(index)).then_some(halfway),
            detach_after: (args.detach == Some(index)).then_some(halfway),
        };

        let delivery = delivery.clone();
        let spawned = thread::Builder::new()
            .name(format!("worker-{}", index))
            .spawn(move || worker.run(delivery));
        match spawned {
            Ok(handle) => workers.push((id, handle)),
            Err(e) => eprintln!("Failed to start worker {}: {}", index, e),
        }
    }
    // Workers hold the remaining handles; the loop ends when the last one finishes.
    drop(delivery);

    println!("Starting {} simulated downloads", workers.len());
    let start = Instant::now();

    // This task is the consumption context: every callback runs here.
    let delivered = task_loop.run().await;

    for (id, handle) in workers {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => eprintln!("Download {} stopped reporting: {}", id, e),
            Err(_) => eprintln!("Download {} worker panicked", id),
        }
    }

    println!(
        "Delivered {} events for {} in {:.2}s",
        delivered,
        format_bytes(total_bytes(args.workers, args.chunks, args.chunk_size)),
        start.elapsed().as_secs_f64()
    );
}

/// Bytes all workers report in total, saturating instead of overflowing.
fn total_bytes(workers: usize, chunks: u64, chunk_size: u64) -> u64 {
    (workers as u64)
        .saturating_mul(chunks)
        .saturating_mul(chunk_size)
}
