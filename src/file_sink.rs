use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::record::LogRecord;
use crate::sink::LogSink;
use crate::writer::{RotatingWriter, RotationPolicy};
use async_trait::async_trait;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// [`LogSink`] that formats records into lines and appends them to a
/// [`RotatingWriter`].
///
/// All file operations go through one mutex, so a final flush from another
/// task serializes with the consumer.
pub struct RotatingFileSink {
    directory: PathBuf,
    writer: Mutex<RotatingWriter>,
}

impl RotatingFileSink {
    /// Validate the configuration and create the log directory if missing.
    ///
    /// No file is opened until the first record arrives.
    pub fn new(config: &SinkConfig) -> Result<Self, SinkError> {
        let policy = RotationPolicy::from_config(config)?;
        std::fs::create_dir_all(&policy.directory).map_err(|source| SinkError::CreateDirectory {
            path: policy.directory.clone(),
            source,
        })?;

        Ok(Self {
            directory: policy.directory.clone(),
            writer: Mutex::new(RotatingWriter::new(policy)),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file currently being appended to.
    pub async fn current_path(&self) -> Option<PathBuf> {
        self.writer.lock().await.current_path().map(Path::to_path_buf)
    }
}

#[async_trait]
impl LogSink for RotatingFileSink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        let line = record.format_line();
        let mut writer = self.writer.lock().await;
        writer.append(&line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
