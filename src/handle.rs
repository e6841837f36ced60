use crate::config::FilterConfig;
use crate::filter::LevelFilter;
use crate::record::{ErrorDetail, Level, LogRecord};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

/// Lifecycle of a sink service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SinkState {
    Starting = 0,
    Running = 1,
    Draining = 2,
    Stopped = 3,
}

impl SinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SinkState::Starting,
            1 => SinkState::Running,
            2 => SinkState::Draining,
            _ => SinkState::Stopped,
        }
    }
}

/// Counters maintained by the producer path and the consumer task.
#[derive(Debug, Default)]
pub struct SinkStats {
    /// Records offered to the sink, before filtering.
    pub submitted: AtomicU64,
    /// Rejected by the level filter.
    pub filtered: AtomicU64,
    /// Accepted into the queue.
    pub enqueued: AtomicU64,
    /// Dropped because the sink was shutting down or stopped.
    pub dropped: AtomicU64,
    /// Successfully written by the consumer.
    pub written: AtomicU64,
    /// Failed to format or write.
    pub failed: AtomicU64,
}

/// Point-in-time copy of [`SinkStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub filtered: u64,
    pub enqueued: u64,
    pub dropped: u64,
    pub written: u64,
    pub failed: u64,
}

impl SinkStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// State shared by producers, the service and the consumer task.
pub(crate) struct Shared {
    pub(crate) sender: mpsc::UnboundedSender<LogRecord>,
    pub(crate) filter: LevelFilter,
    pub(crate) stats: SinkStats,
    pub(crate) shutdown: Notify,
    state: AtomicU8,
}

impl Shared {
    pub(crate) fn new(sender: mpsc::UnboundedSender<LogRecord>, filter: FilterConfig) -> Self {
        Self {
            sender,
            filter: LevelFilter::new(filter),
            stats: SinkStats::default(),
            shutdown: Notify::new(),
            state: AtomicU8::new(SinkState::Starting as u8),
        }
    }

    pub(crate) fn state(&self) -> SinkState {
        SinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SinkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Move to `Draining` and wake the consumer. Returns `false` if the sink
    /// was already draining or stopped.
    pub(crate) fn begin_drain(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= SinkState::Draining as u8 {
                return false;
            }
            match self.state.compare_exchange(
                current,
                SinkState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.shutdown.notify_one();
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn accepting(&self) -> bool {
        matches!(self.state(), SinkState::Starting | SinkState::Running)
    }

    /// Count a submission and apply the level filter.
    fn admit(&self, category: &str, level: Level) -> bool {
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        if self.filter.should_log(category, level) {
            return true;
        }
        self.stats.filtered.fetch_add(1, Ordering::Relaxed);
        false
    }

    fn enqueue(&self, record: LogRecord) {
        if !self.accepting() || self.sender.send(record).is_err() {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
    }
}

/// Cheap, cloneable producer handle.
///
/// Every method is fire-and-forget: it never blocks on I/O, never fails,
/// and silently drops the record once the sink is shutting down.
#[derive(Clone)]
pub struct SinkHandle {
    shared: Arc<Shared>,
}

impl SinkHandle {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Whether a record for `category` at `level` would currently be kept.
    pub fn is_enabled(&self, category: &str, level: Level) -> bool {
        self.shared.accepting() && self.shared.filter.should_log(category, level)
    }

    /// Filter and enqueue a prebuilt record.
    pub fn submit(&self, record: LogRecord) {
        if self.shared.admit(&record.category, record.level) {
            self.shared.enqueue(record);
        }
    }

    /// Count a submission and apply the level filter, without building a
    /// record yet. Pair with [`SinkHandle::enqueue`].
    pub(crate) fn admit(&self, category: &str, level: Level) -> bool {
        self.shared.admit(category, level)
    }

    /// Queue an admitted record, or count it as dropped once draining.
    pub(crate) fn enqueue(&self, record: LogRecord) {
        self.shared.enqueue(record);
    }

    /// Build a record stamped now and submit it.
    pub fn log(
        &self,
        category: &str,
        level: Level,
        message: impl Into<String>,
        error: Option<ErrorDetail>,
    ) {
        if self.shared.admit(category, level) {
            self.shared.enqueue(LogRecord::new(category, level, message, error));
        }
    }

    /// Logger bound to one category.
    pub fn logger(&self, category: impl Into<String>) -> CategoryLogger {
        let category: String = category.into();
        CategoryLogger { category: Arc::from(category), handle: self.clone() }
    }

    /// Publish new level thresholds.
    pub fn reload_filter(&self, config: FilterConfig) {
        self.shared.filter.reload(config);
    }

    pub fn state(&self) -> SinkState {
        self.shared.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }
}

/// Producer bound to a fixed category.
#[derive(Clone)]
pub struct CategoryLogger {
    category: Arc<str>,
    handle: SinkHandle,
}

impl CategoryLogger {
    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_enabled(&self, level: Level) -> bool {
        self.handle.is_enabled(&self.category, level)
    }

    pub fn log(&self, level: Level, message: impl Into<String>, error: Option<ErrorDetail>) {
        self.handle.log(&self.category, level, message, error);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message, None);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::Information, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warning, message, None);
    }

    pub fn error(&self, message: impl Into<String>, error: Option<ErrorDetail>) {
        self.log(Level::Error, message, error);
    }

    pub fn critical(&self, message: impl Into<String>, error: Option<ErrorDetail>) {
        self.log(Level::Critical, message, error);
    }
}
