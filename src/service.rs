use crate::config::{FilterConfig, SinkConfig};
use crate::error::SinkError;
use crate::file_sink::RotatingFileSink;
use crate::handle::{CategoryLogger, Shared, SinkHandle, SinkState, SinkStats, StatsSnapshot};
use crate::record::{ErrorDetail, Level, LogRecord};
use crate::sink::LogSink;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// How a [`LogSinkService::shutdown`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every accepted record was handed to the sink and the sink flushed.
    Drained,
    /// The drain timeout elapsed; the remaining backlog is abandoned.
    TimedOut,
    /// The consumer task panicked or was cancelled.
    ConsumerFailed,
    /// Shutdown had already completed.
    AlreadyStopped,
}

/// Process-wide log sink: owns the record queue and the single background
/// consumer that writes records to a [`LogSink`] in submission order.
///
/// Producers use [`SinkHandle`]s (see [`LogSinkService::handle`]), which
/// never block on I/O and never fail.
///
/// Dropping the service without calling [`LogSinkService::shutdown`] stops
/// intake and lets the consumer drain in the background.
pub struct LogSinkService {
    shared: Arc<Shared>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    drain_timeout: Duration,
}

impl LogSinkService {
    /// Start a service writing rotating files as described by `config`.
    ///
    /// Fails if the configuration is invalid, the log directory cannot be
    /// created, or no Tokio runtime is running.
    pub fn start(config: SinkConfig) -> Result<Self, SinkError> {
        let sink = RotatingFileSink::new(&config)?;
        let drain_timeout = config.drain_timeout();
        Self::with_sink(Arc::new(sink), config.filter, drain_timeout)
    }

    /// Start a service in front of an arbitrary [`LogSink`].
    pub fn with_sink(
        sink: Arc<dyn LogSink>,
        filter: FilterConfig,
        drain_timeout: Duration,
    ) -> Result<Self, SinkError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SinkError::NoRuntime)?;

        let (tx, rx) = mpsc::unbounded_channel::<LogRecord>();
        let shared = Arc::new(Shared::new(tx, filter));
        let consumer = runtime.spawn(run_consumer(rx, sink, Arc::clone(&shared)));
        shared.set_state(SinkState::Running);

        Ok(Self {
            shared,
            consumer: Mutex::new(Some(consumer)),
            drain_timeout,
        })
    }

    /// Cloneable producer handle.
    pub fn handle(&self) -> SinkHandle {
        SinkHandle::new(Arc::clone(&self.shared))
    }

    /// Producer bound to `category`.
    pub fn logger(&self, category: impl Into<String>) -> CategoryLogger {
        self.handle().logger(category)
    }

    /// Fire-and-forget submission; see [`SinkHandle::log`].
    pub fn log(&self, category: &str, level: Level, message: impl Into<String>, error: Option<ErrorDetail>) {
        self.handle().log(category, level, message, error);
    }

    /// Publish new level thresholds for subsequently filtered records.
    pub fn reload_filter(&self, config: FilterConfig) {
        self.shared.filter.reload(config);
    }

    pub fn state(&self) -> SinkState {
        self.shared.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Stop intake and wait up to the drain timeout for the backlog to be
    /// written. Records submitted from now on are dropped.
    pub async fn shutdown(&self) -> DrainOutcome {
        self.shared.begin_drain();

        let consumer = self.consumer.lock().ok().and_then(|mut guard| guard.take());
        let Some(consumer) = consumer else {
            return DrainOutcome::AlreadyStopped;
        };

        let outcome = match tokio::time::timeout(self.drain_timeout, consumer).await {
            Ok(Ok(())) => DrainOutcome::Drained,
            Ok(Err(e)) => {
                eprintln!("log consumer task failed: {}", e);
                DrainOutcome::ConsumerFailed
            }
            Err(_) => {
                eprintln!(
                    "log sink drain timed out after {:?}, dropping remaining records",
                    self.drain_timeout
                );
                DrainOutcome::TimedOut
            }
        };
        self.shared.set_state(SinkState::Stopped);
        outcome
    }
}

impl Drop for LogSinkService {
    fn drop(&mut self) {
        self.shared.begin_drain();
    }
}

async fn run_consumer(
    mut rx: mpsc::UnboundedReceiver<LogRecord>,
    sink: Arc<dyn LogSink>,
    shared: Arc<Shared>,
) {
    loop {
        tokio::select! {
            biased;
            maybe = rx.recv() => match maybe {
                Some(record) => write_record(&*sink, &record, &shared.stats).await,
                None => break,
            },
            _ = shared.shutdown.notified() => break,
        }
    }

    // No new records from here on; drain what is already queued.
    rx.close();
    while let Some(record) = rx.recv().await {
        if shared.state() == SinkState::Stopped {
            let mut abandoned = 1;
            while rx.try_recv().is_ok() {
                abandoned += 1;
            }
            shared.stats.dropped.fetch_add(abandoned, Ordering::Relaxed);
            break;
        }
        write_record(&*sink, &record, &shared.stats).await;
    }

    if let Err(e) = sink.flush().await {
        eprintln!("error flushing log sink: {}", e);
    }
    shared.set_state(SinkState::Stopped);
}

async fn write_record(sink: &dyn LogSink, record: &LogRecord, stats: &SinkStats) {
    match sink.send(record).await {
        Ok(()) => {
            stats.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            eprintln!(
                "error writing log record [{}] {}: {}",
                record.category, record.level, e
            );
            eprintln!("{}", fallback_entry(record));
        }
    }
}

/// Stderr copy of a record the sink failed to write.
fn fallback_entry(record: &LogRecord) -> String {
    format!("[FALLBACK LOG] {}", record.format_line().trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noop_sink::NoopSink;

    #[test]
    fn start_without_runtime_fails() {
        let result = LogSinkService::with_sink(
            Arc::new(NoopSink::default()),
            FilterConfig::default(),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(SinkError::NoRuntime)));
    }

    #[tokio::test]
    async fn lifecycle_moves_from_running_to_stopped() {
        let sink = Arc::new(NoopSink::default());
        let service = LogSinkService::with_sink(
            sink.clone(),
            FilterConfig::default(),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(service.state(), SinkState::Running);

        service.log("Leads", Level::Information, "one", None);
        assert_eq!(service.shutdown().await, DrainOutcome::Drained);
        assert_eq!(service.state(), SinkState::Stopped);
        assert_eq!(service.stats().written, 1);
        assert_eq!(sink.received(), 1);

        assert_eq!(service.shutdown().await, DrainOutcome::AlreadyStopped);
    }

    #[test]
    fn fallback_entry_keeps_record_text() {
        let record = LogRecord::new(
            "Payments",
            Level::Error,
            "PAYMENT 42 REFUNDED",
            Some(ErrorDetail::new("gateway timeout")),
        );
        let entry = fallback_entry(&record);
        assert!(entry.starts_with("[FALLBACK LOG] ["));
        assert!(entry.contains("ERROR [Payments] PAYMENT 42 REFUNDED\ngateway timeout"));
        assert!(!entry.ends_with('\n'));
    }
}
