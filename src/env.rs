//! Environment variable names understood by
//! [`SinkConfig::from_env`](crate::config::SinkConfig::from_env).
//!
//! These are purely helpers; the sink itself never reads the
//! environment.

/// Directory that receives the log files.
pub const LOG_SINK_DIR_ENV: &str = "LOG_SINK_DIR";

/// Base file name, without date or extension.
pub const LOG_SINK_FILE_NAME_ENV: &str = "LOG_SINK_FILE_NAME";

/// File extension, with or without the leading dot.
pub const LOG_SINK_FILE_EXTENSION_ENV: &str = "LOG_SINK_FILE_EXTENSION";

/// Rotation threshold in bytes.
pub const LOG_SINK_MAX_FILE_BYTES_ENV: &str = "LOG_SINK_MAX_FILE_BYTES";

/// Number of files kept on disk.
pub const LOG_SINK_RETAINED_FILES_ENV: &str = "LOG_SINK_RETAINED_FILES";

/// Default minimum level, e.g. `Information` or `warn`.
pub const LOG_SINK_MIN_LEVEL_ENV: &str = "LOG_SINK_MIN_LEVEL";

/// Upper bound for the shutdown drain, in milliseconds.
pub const LOG_SINK_DRAIN_TIMEOUT_MS_ENV: &str = "LOG_SINK_DRAIN_TIMEOUT_MS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable. Unset yields `Ok(None)`.
pub fn env_parse<T>(key: &str) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("{key}={raw:?}: {e}")),
        Err(_) => Ok(None),
    }
}
