use crate::env::{self, env_parse};
use crate::error::SinkError;
use crate::record::Level;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default rotation threshold: 5 MiB.
pub const DEFAULT_FILE_SIZE_LIMIT_BYTES: u64 = 5 * 1024 * 1024;

/// Default number of files kept on disk.
pub const DEFAULT_RETAINED_FILE_COUNT: usize = 5;

/// Default upper bound for draining the queue on shutdown.
pub const DEFAULT_DRAIN_TIMEOUT_MS: u64 = 5_000;

/// Level thresholds. This is the part of the configuration that can be
/// swapped while the sink runs.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub default_min_level: Level,
    pub per_category_min_level: HashMap<String, Level>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            default_min_level: Level::Information,
            per_category_min_level: HashMap::new(),
        }
    }
}

impl FilterConfig {
    pub fn new(default_min_level: Level) -> Self {
        Self { default_min_level, ..Self::default() }
    }

    /// Builder-style helper to add a per-category threshold.
    pub fn with_category(mut self, category: impl Into<String>, level: Level) -> Self {
        self.per_category_min_level.insert(category.into(), level);
        self
    }
}

/// Full sink configuration, read once when the sink starts.
///
/// JSON keys follow the camelCase names below, e.g.
///
/// ```json
/// {
///   "defaultMinLevel": "Information",
///   "perCategoryMinLevel": { "Api.Payments": "Debug" },
///   "logDirectory": "Logs",
///   "fileName": "app",
///   "fileSizeLimitBytes": 5242880,
///   "retainedFileCountLimit": 5
/// }
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SinkConfig {
    #[serde(flatten)]
    pub filter: FilterConfig,
    pub log_directory: PathBuf,
    #[serde(rename = "fileName", alias = "fileBaseName")]
    pub file_base_name: String,
    pub file_extension: String,
    #[serde(rename = "fileSizeLimitBytes", alias = "maxFileSizeBytes")]
    pub max_file_size_bytes: u64,
    #[serde(rename = "retainedFileCountLimit", alias = "maxRetainedFiles")]
    pub max_retained_files: usize,
    pub drain_timeout_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            log_directory: PathBuf::from("Logs"),
            file_base_name: "log".to_string(),
            file_extension: "log".to_string(),
            max_file_size_bytes: DEFAULT_FILE_SIZE_LIMIT_BYTES,
            max_retained_files: DEFAULT_RETAINED_FILE_COUNT,
            drain_timeout_ms: DEFAULT_DRAIN_TIMEOUT_MS,
        }
    }
}

impl SinkConfig {
    /// Defaults with the given target directory.
    pub fn new(log_directory: impl Into<PathBuf>) -> Self {
        Self { log_directory: log_directory.into(), ..Self::default() }
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SinkError> {
        let config: SinkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `LOG_SINK_*` variables on top of the
    /// defaults. See [`crate::env`] for the names.
    pub fn from_env() -> Result<Self, SinkError> {
        let mut config = Self::default();
        let default_dir = config.log_directory.to_string_lossy().into_owned();
        config.log_directory = PathBuf::from(env::env_or(env::LOG_SINK_DIR_ENV, &default_dir));
        config.file_base_name = env::env_or(env::LOG_SINK_FILE_NAME_ENV, &config.file_base_name);
        config.file_extension = env::env_or(env::LOG_SINK_FILE_EXTENSION_ENV, &config.file_extension);

        if let Some(bytes) = env_parse::<u64>(env::LOG_SINK_MAX_FILE_BYTES_ENV).map_err(SinkError::InvalidConfig)? {
            config.max_file_size_bytes = bytes;
        }
        if let Some(count) = env_parse::<usize>(env::LOG_SINK_RETAINED_FILES_ENV).map_err(SinkError::InvalidConfig)? {
            config.max_retained_files = count;
        }
        if let Some(level) = env_parse::<Level>(env::LOG_SINK_MIN_LEVEL_ENV).map_err(SinkError::InvalidConfig)? {
            config.filter.default_min_level = level;
        }
        if let Some(ms) = env_parse::<u64>(env::LOG_SINK_DRAIN_TIMEOUT_MS_ENV).map_err(SinkError::InvalidConfig)? {
            config.drain_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Extension without a leading dot.
    pub fn normalized_extension(&self) -> &str {
        self.file_extension.trim_start_matches('.')
    }

    /// Reject configurations the writer cannot honor.
    pub fn validate(&self) -> Result<(), SinkError> {
        if self.max_file_size_bytes == 0 {
            return Err(SinkError::InvalidConfig(
                "fileSizeLimitBytes must be greater than zero".to_string(),
            ));
        }
        if self.max_retained_files == 0 {
            return Err(SinkError::InvalidConfig(
                "retainedFileCountLimit must be at least 1".to_string(),
            ));
        }
        if self.file_base_name.trim().is_empty() {
            return Err(SinkError::InvalidConfig("fileName must not be empty".to_string()));
        }
        if self.file_base_name.contains(['/', '\\']) {
            return Err(SinkError::InvalidConfig(format!(
                "fileName must not contain path separators: {:?}",
                self.file_base_name
            )));
        }
        if self.normalized_extension().is_empty() {
            return Err(SinkError::InvalidConfig("fileExtension must not be empty".to_string()));
        }
        Ok(())
    }
}
