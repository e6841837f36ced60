use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a [`LogRecord`], ordered from most verbose to silent.
///
/// `None` never appears on an emitted record; as a minimum level it
/// disables a category entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Information = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
    None = 6,
}

impl Level {
    /// Uppercase label used in formatted lines.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Information => "INFORMATION",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
            Level::None => "NONE",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a level name cannot be parsed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    /// Accepts full names and the usual short aliases, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "information" | "info" => Ok(Level::Information),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            "critical" | "fatal" => Ok(Level::Critical),
            "none" | "off" => Ok(Level::None),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl TryFrom<String> for Level {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, ParseLevelError> {
        value.parse()
    }
}

impl From<Level> for String {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => "Trace",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Critical => "Critical",
            Level::None => "None",
        }
        .to_string()
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::TRACE {
            Level::Trace
        } else if *level == tracing::Level::DEBUG {
            Level::Debug
        } else if *level == tracing::Level::INFO {
            Level::Information
        } else if *level == tracing::Level::WARN {
            Level::Warning
        } else {
            Level::Error
        }
    }
}

/// Error attached to a record: a headline plus an optional multi-line
/// detail block (cause chain, backtrace, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), detail: None }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Capture an error and its `source()` chain, one cause per line.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("  caused by: {}", cause));
            source = cause.source();
        }

        Self {
            message: err.to_string(),
            detail: if causes.is_empty() { None } else { Some(causes.join("\n")) },
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n{}", detail)?;
        }
        Ok(())
    }
}

/// Immutable log entry handed from producers to the background writer.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub category: String,
    pub message: String,
    pub error: Option<ErrorDetail>,
}

impl LogRecord {
    /// Build a record stamped with the current time.
    pub fn new(
        category: impl Into<String>,
        level: Level,
        message: impl Into<String>,
        error: Option<ErrorDetail>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            category: category.into(),
            message: message.into(),
            error,
        }
    }

    /// Render the record as one newline-terminated line:
    ///
    /// `[2026-10-19 08:30:00.123] ERROR [Api.Payments] message`
    ///
    /// followed by the error block on its own line(s) when present.
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "[{}] {:<5} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.category,
            self.message
        );
        if let Some(error) = &self.error {
            line.push('\n');
            line.push_str(&error.to_string());
        }
        line.push('\n');
        line
    }
}
