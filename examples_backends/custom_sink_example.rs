use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing_file_sink::{sink::LogSink, FilterConfig, Level, LogRecord, LogSinkService};

/// Example of putting the queue and level filter in front of a custom
/// destination by implementing `LogSink` directly. Here it only prints the
/// formatted line.
struct StdoutSink;

#[async_trait]
impl LogSink for StdoutSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        print!("[stdout-sink] {}", record.format_line());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn LogSink> = Arc::new(StdoutSink);
    let service = LogSinkService::with_sink(
        sink,
        FilterConfig::new(Level::Information).with_category("Payments", Level::Debug),
        Duration::from_secs(5),
    )?;

    let payments = service.logger("Payments");
    payments.debug("charge payload built");
    payments.info("charge accepted");
    service.log("Students", Level::Debug, "filtered out by the default level", None);

    service.shutdown().await;
    Ok(())
}
