//! Asynchronous rotating file log sink.
//!
//! Producers submit [`record::LogRecord`]s through a [`handle::SinkHandle`]
//! (or the [`layer::FileLogLayer`] for `tracing` events). Records pass a
//! per-category [`filter::LevelFilter`], are queued without blocking, and a
//! single background task appends them to date-named files that rotate by
//! size and are pruned to a retention count.

pub mod config;
pub mod env;
pub mod error;
pub mod file_sink;
pub mod filter;
pub mod handle;
pub mod layer;
pub mod record;
pub mod service;
pub mod sink;
pub mod writer;

pub mod init;
pub mod noop_sink;

pub use config::{FilterConfig, SinkConfig};
pub use error::SinkError;
pub use handle::{CategoryLogger, SinkHandle, SinkState, StatsSnapshot};
pub use record::{ErrorDetail, Level, LogRecord};
pub use service::{DrainOutcome, LogSinkService};
