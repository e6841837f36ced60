use crate::config::SinkConfig;
use crate::error::SinkError;
use chrono::{Local, NaiveDate};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Naming and size limits for rotated files.
///
/// Files are named `<base>-<yyyyMMdd>.<ext>` for the first file of a day
/// and `<base>-<yyyyMMdd>_<nnn>.<ext>` for each size rotation after it.
#[derive(Clone, Debug)]
pub struct RotationPolicy {
    pub directory: PathBuf,
    pub base_name: String,
    pub extension: String,
    pub max_file_size_bytes: u64,
    pub max_retained_files: usize,
}

impl RotationPolicy {
    pub fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        config.validate()?;
        Ok(Self {
            directory: config.log_directory.clone(),
            base_name: config.file_base_name.clone(),
            extension: config.normalized_extension().to_string(),
            max_file_size_bytes: config.max_file_size_bytes,
            max_retained_files: config.max_retained_files,
        })
    }

    pub fn file_name(&self, date: NaiveDate, sequence: u32) -> String {
        let date = date.format("%Y%m%d");
        if sequence == 0 {
            format!("{}-{}.{}", self.base_name, date, self.extension)
        } else {
            format!("{}-{}_{:03}.{}", self.base_name, date, sequence, self.extension)
        }
    }

    pub fn path_for(&self, date: NaiveDate, sequence: u32) -> PathBuf {
        self.directory.join(self.file_name(date, sequence))
    }

    /// Parse a file name produced by [`RotationPolicy::file_name`].
    /// Anything else in the directory yields `None` and is left alone.
    pub fn parse_file_name(&self, name: &str) -> Option<(NaiveDate, u32)> {
        let stem = name
            .strip_prefix(self.base_name.as_str())?
            .strip_prefix('-')?
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;

        let (date, sequence) = match stem.split_once('_') {
            Some((date, seq)) if !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()) => {
                (date, seq.parse().ok()?)
            }
            Some(_) => return None,
            None => (stem, 0),
        };
        if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let date = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
        Some((date, sequence))
    }
}

/// A log file found on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub date: NaiveDate,
    pub sequence: u32,
}

struct RotationState {
    path: PathBuf,
    date: NaiveDate,
    sequence: u32,
    len: u64,
    file: File,
}

/// Appends formatted lines to the current file, rotating on size or day
/// change and pruning old files beyond the retention count.
///
/// The byte length of the open file is tracked in memory and only
/// re-read from the filesystem when a file is (re)opened.
pub struct RotatingWriter {
    policy: RotationPolicy,
    state: Option<RotationState>,
}

impl RotatingWriter {
    pub fn new(policy: RotationPolicy) -> Self {
        Self { policy, state: None }
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Path of the open file, if any.
    pub fn current_path(&self) -> Option<&Path> {
        self.state.as_ref().map(|s| s.path.as_path())
    }

    /// Cached byte length of the open file.
    pub fn current_len(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.len)
    }

    /// Append `line` to today's file. Files are dated by the local calendar
    /// day, while line timestamps stay UTC.
    pub async fn append(&mut self, line: &str) -> io::Result<()> {
        self.append_on(Local::now().date_naive(), line).await
    }

    /// Append `line` as if the current date were `date`.
    pub async fn append_on(&mut self, date: NaiveDate, line: &str) -> io::Result<()> {
        let bytes = line.as_bytes();

        if self.state.as_ref().map_or(true, |s| s.date != date) {
            self.finalize().await?;
            self.state = Some(self.open_for(date).await?);
        }

        let needs_rotation = self.state.as_ref().map_or(false, |s| {
            s.len > 0 && s.len + bytes.len() as u64 > self.policy.max_file_size_bytes
        });
        if needs_rotation {
            self.rotate().await?;
        }

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file is not open"))?;
        state.file.write_all(bytes).await?;
        state.file.flush().await?;
        state.len += bytes.len() as u64;
        Ok(())
    }

    /// Flush and sync the open file, if any.
    pub async fn flush(&mut self) -> io::Result<()> {
        if let Some(state) = self.state.as_mut() {
            state.file.flush().await?;
            state.file.sync_data().await?;
        }
        Ok(())
    }

    /// List files matching the naming pattern, newest first.
    pub async fn list_files(&self) -> io::Result<Vec<LogFile>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.policy.directory).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some((date, sequence)) = self.policy.parse_file_name(name) {
                files.push(LogFile { path: entry.path(), date, sequence });
            }
        }
        files.sort_by(|a, b| (b.date, b.sequence).cmp(&(a.date, a.sequence)));
        Ok(files)
    }

    async fn finalize(&mut self) -> io::Result<()> {
        let result = self.flush().await;
        self.state = None;
        result
    }

    async fn rotate(&mut self) -> io::Result<()> {
        let (date, sequence) = match self.state.as_ref() {
            Some(s) => (s.date, s.sequence),
            None => return Ok(()),
        };
        if let Err(e) = self.finalize().await {
            eprintln!("log writer: failed to finalize {}: {}", self.policy.file_name(date, sequence), e);
        }
        self.state = Some(self.create(date, sequence + 1).await?);
        Ok(())
    }

    /// Resume the newest existing file for `date`, or start a new one.
    async fn open_for(&self, date: NaiveDate) -> io::Result<RotationState> {
        let existing = match self.list_files().await {
            Ok(files) => files.into_iter().find(|f| f.date == date),
            Err(e) => {
                eprintln!("log writer: failed to list {}: {}", self.policy.directory.display(), e);
                None
            }
        };

        match existing {
            Some(found) => {
                let file = OpenOptions::new().create(true).append(true).open(&found.path).await?;
                let len = file.metadata().await?.len();
                Ok(RotationState { path: found.path, date, sequence: found.sequence, len, file })
            }
            None => self.create(date, 0).await,
        }
    }

    /// Prune to make room, then create the file for `(date, sequence)`.
    async fn create(&self, date: NaiveDate, sequence: u32) -> io::Result<RotationState> {
        self.prune(self.policy.max_retained_files.saturating_sub(1)).await;

        let path = self.policy.path_for(date, sequence);
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        let len = file.metadata().await?.len();
        Ok(RotationState { path, date, sequence, len, file })
    }

    /// Delete every matching file beyond the `keep` newest. Failures are
    /// reported on stderr and otherwise ignored.
    async fn prune(&self, keep: usize) {
        let files = match self.list_files().await {
            Ok(files) => files,
            Err(e) => {
                eprintln!("log writer: failed to list {} for retention: {}", self.policy.directory.display(), e);
                return;
            }
        };

        for old in files.iter().skip(keep) {
            if let Err(e) = fs::remove_file(&old.path).await {
                eprintln!("log writer: failed to delete old log file {}: {}", old.path.display(), e);
            }
        }
    }
}
