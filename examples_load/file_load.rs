use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

use tracing_file_sink::init::{init_tracing_with_config, LayerConfig};
use tracing_file_sink::noop_sink::NoopSink;
use tracing_file_sink::{FilterConfig, Level, LogSinkService, SinkConfig};

/// Pass `noop` as the first argument to measure queue overhead without
/// disk I/O.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let noop = std::env::args().nth(1).as_deref() == Some("noop");

    let service = if noop {
        LogSinkService::with_sink(
            Arc::new(NoopSink::default()),
            FilterConfig::new(Level::Information),
            Duration::from_secs(5),
        )?
    } else {
        let mut config = SinkConfig::new("./load_logs");
        config.max_file_size_bytes = 1024 * 1024;
        config.max_retained_files = 3;
        LogSinkService::start(config)?
    };
    init_tracing_with_config(&service, LayerConfig { enable_stdout: false })?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "file load test error");
    }

    let elapsed = start.elapsed();
    println!("{}: submitted {} events in {:?} (~{:.0} ev/s)",
        if noop { "noop sink" } else { "file sink" },
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    let outcome = service.shutdown().await;
    println!("shutdown: {:?}, stats: {:?}", outcome, service.stats());
    Ok(())
}
