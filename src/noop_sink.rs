use crate::record::LogRecord;
use crate::sink::LogSink;
use async_trait::async_trait;
use std::error::Error;
use std::sync::atomic::{AtomicU64, Ordering};

/// A sink that discards records and only counts them.
///
/// Useful for measuring the overhead of the queue and consumer without any
/// disk I/O, and for tests that only care about delivery counts.
#[derive(Default)]
pub struct NoopSink {
    received: AtomicU64,
}

impl NoopSink {
    /// Records handed to this sink so far.
    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
