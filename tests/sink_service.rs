use async_trait::async_trait;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tracing_file_sink::sink::LogSink;
use tracing_file_sink::writer::RotationPolicy;
use tracing_file_sink::{
    DrainOutcome, FilterConfig, Level, LogRecord, LogSinkService, SinkConfig, SinkError, SinkState,
};

fn config(dir: &Path) -> SinkConfig {
    let mut config = SinkConfig::new(dir);
    config.filter = FilterConfig::new(Level::Trace);
    config
}

/// Matching log files, oldest first.
fn log_files(config: &SinkConfig) -> Vec<PathBuf> {
    let policy = RotationPolicy::from_config(config).unwrap();
    let mut files: Vec<_> = std::fs::read_dir(&config.log_directory)
        .unwrap()
        .filter_map(|e| {
            let path = e.unwrap().path();
            let name = path.file_name()?.to_str()?.to_string();
            policy.parse_file_name(&name).map(|key| (key, path))
        })
        .collect();
    files.sort();
    files.into_iter().map(|(_, path)| path).collect()
}

fn all_lines(config: &SinkConfig) -> Vec<String> {
    log_files(config)
        .iter()
        .flat_map(|p| {
            std::fs::read_to_string(p)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[tokio::test]
async fn writes_only_records_at_or_above_threshold() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.filter = FilterConfig::new(Level::Warning).with_category("Api.Payments", Level::Debug);

    let service = LogSinkService::start(cfg.clone()).unwrap();
    service.log("Api.Students", Level::Information, "student created", None);
    service.log("Api.Students", Level::Warning, "duplicate email", None);
    service.log("Api.Payments", Level::Debug, "charge payload", None);
    service.log("Api.Payments", Level::Trace, "raw bytes", None);
    assert_eq!(service.shutdown().await, DrainOutcome::Drained);

    let lines = all_lines(&cfg);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("WARNING [Api.Students] duplicate email"));
    assert!(lines[1].ends_with("DEBUG [Api.Payments] charge payload"));
}

#[tokio::test]
async fn error_detail_is_written_below_the_line() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());

    let service = LogSinkService::start(cfg.clone()).unwrap();
    let logger = service.logger("Files");
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "blob not found");
    logger.error("download failed", Some(tracing_file_sink::ErrorDetail::from_error(&io)));
    service.shutdown().await;

    let lines = all_lines(&cfg);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("ERROR [Files] download failed"));
    assert_eq!(lines[1], "blob not found");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn per_producer_order_survives_rotation() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.max_file_size_bytes = 4096;
    cfg.max_retained_files = 1000;

    let service = LogSinkService::start(cfg.clone()).unwrap();
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let logger = service.logger(format!("producer{}", p));
            std::thread::spawn(move || {
                for i in 0..200 {
                    logger.info(format!("{:04}", i));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }
    assert_eq!(service.shutdown().await, DrainOutcome::Drained);
    assert!(log_files(&cfg).len() > 1);

    let lines = all_lines(&cfg);
    assert_eq!(lines.len(), 800);
    for p in 0..4 {
        let tag = format!("[producer{}] ", p);
        let seen: Vec<u32> = lines
            .iter()
            .filter_map(|l| l.split_once(&tag).map(|(_, n)| n.parse().unwrap()))
            .collect();
        assert_eq!(seen, (0..200).collect::<Vec<u32>>());
    }
}

#[tokio::test]
async fn shutdown_drains_backlog_and_drops_late_records() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());

    let service = LogSinkService::start(cfg.clone()).unwrap();
    let handle = service.handle();
    for i in 0..500 {
        handle.log("Leads", Level::Information, format!("lead {}", i), None);
    }

    assert_eq!(service.shutdown().await, DrainOutcome::Drained);
    assert_eq!(service.state(), SinkState::Stopped);
    handle.log("Leads", Level::Critical, "too late", None);

    let lines = all_lines(&cfg);
    assert_eq!(lines.len(), 500);
    assert!(lines.iter().all(|l| !l.contains("too late")));

    let stats = handle.stats();
    assert_eq!(stats.written, 500);
    assert_eq!(stats.dropped, 1);
}

/// Fails every record whose message is `boom`.
#[derive(Default)]
struct FlakySink {
    written: Mutex<Vec<String>>,
}

#[async_trait]
impl LogSink for FlakySink {
    async fn send(&self, record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        if record.message == "boom" {
            return Err("simulated write failure".into());
        }
        self.written.lock().unwrap().push(record.message.clone());
        Ok(())
    }
}

#[tokio::test]
async fn failing_record_does_not_stop_consumer() {
    let sink = Arc::new(FlakySink::default());
    let service =
        LogSinkService::with_sink(sink.clone(), FilterConfig::default(), Duration::from_secs(2)).unwrap();

    service.log("Reports", Level::Error, "before", None);
    service.log("Reports", Level::Error, "boom", None);
    service.log("Reports", Level::Error, "after", None);
    assert_eq!(service.shutdown().await, DrainOutcome::Drained);

    assert_eq!(*sink.written.lock().unwrap(), vec!["before", "after"]);
    let stats = service.stats();
    assert_eq!(stats.written, 2);
    assert_eq!(stats.failed, 1);
}

struct SlowSink;

#[async_trait]
impl LogSink for SlowSink {
    async fn send(&self, _record: &LogRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

#[tokio::test]
async fn shutdown_gives_up_after_drain_timeout() {
    let service = LogSinkService::with_sink(
        Arc::new(SlowSink),
        FilterConfig::default(),
        Duration::from_millis(120),
    )
    .unwrap();
    for i in 0..100 {
        service.log("Email", Level::Information, format!("mail {}", i), None);
    }

    let started = std::time::Instant::now();
    assert_eq!(service.shutdown().await, DrainOutcome::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(service.state(), SinkState::Stopped);
    assert!(service.stats().written < 100);
}

#[tokio::test]
async fn rotation_keeps_two_newest_files() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.max_file_size_bytes = 100;
    cfg.max_retained_files = 2;

    // "[yyyy-MM-dd HH:mm:ss.fff] ERROR [t] mNN\n" is 40 bytes: two per file.
    let service = LogSinkService::start(cfg.clone()).unwrap();
    for i in 0..12 {
        service.log("t", Level::Error, format!("m{:02}", i), None);
    }
    assert_eq!(service.shutdown().await, DrainOutcome::Drained);

    let files = log_files(&cfg);
    assert_eq!(files.len(), 2);
    for f in &files {
        let len = std::fs::metadata(f).unwrap().len();
        assert!(len > 0 && len <= 100);
    }
    let newest = std::fs::read_to_string(&files[1]).unwrap();
    assert!(newest.ends_with("m11\n"));
}

#[tokio::test]
async fn reloaded_filter_applies_to_later_records() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.filter = FilterConfig::new(Level::Error);

    let service = LogSinkService::start(cfg.clone()).unwrap();
    service.log("Courses", Level::Information, "before reload", None);
    service.reload_filter(FilterConfig::new(Level::Information));
    service.log("Courses", Level::Information, "after reload", None);
    service.shutdown().await;

    let lines = all_lines(&cfg);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("after reload"));
}

#[tokio::test]
async fn invalid_configuration_fails_at_start() {
    let dir = tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.max_retained_files = 0;

    let err = LogSinkService::start(cfg).err().unwrap();
    assert!(matches!(err, SinkError::InvalidConfig(_)));
}

#[tokio::test]
async fn start_creates_log_directory() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("var").join("logs");
    let service = LogSinkService::start(config(&target)).unwrap();
    assert!(target.is_dir());
    service.shutdown().await;
}

#[tokio::test]
async fn missing_directory_fails_one_record_and_consumer_recovers() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("logs");
    let cfg = config(&target);

    let service = LogSinkService::start(cfg.clone()).unwrap();
    std::fs::remove_dir_all(&target).unwrap();
    service.log("Payments", Level::Error, "PAYMENT 42 REFUNDED", None);

    for _ in 0..200 {
        if service.stats().failed == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.stats().failed, 1);

    std::fs::create_dir_all(&target).unwrap();
    service.log("Payments", Level::Information, "PAYMENT 43 SETTLED", None);
    assert_eq!(service.shutdown().await, DrainOutcome::Drained);

    let stats = service.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.written, 1);
    let lines = all_lines(&cfg);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("INFORMATION [Payments] PAYMENT 43 SETTLED"));
}
