use std::io;
use std::path::PathBuf;

/// Errors surfaced while configuring or starting a sink.
///
/// Nothing here ever reaches a producer: once the sink runs, per-record
/// failures are reported on stderr and the record is dropped.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("invalid sink configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to create log directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse sink configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no Tokio runtime available to spawn the log consumer")]
    NoRuntime,

    #[error("global tracing subscriber already installed: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
