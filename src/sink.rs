use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for [`LogRecord`]s accepted by the sink service.
///
/// The service calls `send` from its single background consumer task, one
/// record at a time and in queue order, so implementations never see
/// concurrent `send` calls from the service itself.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Persist a single record.
    ///
    /// **Returns**
    /// - `Ok(())` if the record was written.
    /// - `Err(..)` if formatting or I/O failed. The consumer reports the
    ///   error on stderr, drops the record and moves on to the next one.
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered output. Called once after the queue is drained.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
