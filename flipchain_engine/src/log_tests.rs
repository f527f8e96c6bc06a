//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger, FileLogger and LogRegistry.

use crate::log::{DefaultLogger, FileLogger, LogEntry, LogRegistry, LogSeverity, Logger};
use crate::error::Error;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

struct CollectingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl CollectingLogger {
    fn new() -> Arc<Self> {
        Arc::new(Self { entries: Mutex::new(Vec::new()) })
    }

    fn messages(&self) -> Vec<String> {
        self.entries.lock().unwrap().iter().map(|e| e.message.clone()).collect()
    }
}

impl Logger for CollectingLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Info,
        timestamp: SystemTime::now(),
        source: "flipchain::FrameRenderer".to_string(),
        message: "Renderer initialized".to_string(),
        file: None,
        line: None,
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[INFO ]"));
    assert!(line.contains("[flipchain::FrameRenderer]"));
    assert!(line.ends_with("Renderer initialized"));
}

#[test]
fn test_format_plain_with_file_line() {
    let entry = LogEntry {
        severity: LogSeverity::Error,
        timestamp: SystemTime::now(),
        source: "flipchain::FrameSync".to_string(),
        message: "wait failed".to_string(),
        file: Some("frame_sync.rs"),
        line: Some(42),
    };

    let line = DefaultLogger::format_plain(&entry);
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("wait failed (frame_sync.rs:42)"));
}

#[test]
fn test_default_logger_does_not_panic() {
    let entry = LogEntry {
        severity: LogSeverity::Warn,
        timestamp: SystemTime::now(),
        source: "test".to_string(),
        message: "console output".to_string(),
        file: None,
        line: None,
    };
    DefaultLogger.log(&entry);
}

// ============================================================================
// FILE LOGGER TESTS
// ============================================================================

fn log_path(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("flipchain_log_{}_{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("logs").join("engine.log")
}

#[test]
fn test_file_logger_writes_plain_lines() {
    let path = log_path("plain");
    let log = LogRegistry::silent();
    let file = Arc::new(FileLogger::create(&path).unwrap());
    assert_eq!(file.path(), path.as_path());
    log.add_sink(file);

    crate::engine_info!(log, "flipchain::FrameRenderer", "Renderer initialized");
    crate::engine_error!(log, "flipchain::FrameSync", "Fence wait timed out");

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("[INFO ] [flipchain::FrameRenderer] Renderer initialized"), "{}", lines[0]);
    assert!(lines[1].contains("[ERROR] [flipchain::FrameSync] Fence wait timed out ("), "{}", lines[1]);
    assert!(lines[1].contains("log_tests.rs:"), "{}", lines[1]);
    // No ANSI color codes in the file
    assert!(!contents.contains('\u{1b}'));
}

#[test]
fn test_file_logger_appends_across_sinks() {
    let path = log_path("append");
    for message in ["first run", "second run"] {
        let log = LogRegistry::silent();
        log.add_sink(Arc::new(FileLogger::create(&path).unwrap()));
        crate::engine_warn!(log, "flipchain::demo", "{}", message);
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("first run"));
    assert!(lines[1].ends_with("second run"));
}

#[test]
fn test_file_logger_respects_min_severity() {
    let path = log_path("severity");
    let log = LogRegistry::silent();
    log.add_sink(Arc::new(FileLogger::create(&path).unwrap()));
    log.set_min_severity(LogSeverity::Warn);

    crate::engine_debug!(log, "flipchain::test", "hidden");
    crate::engine_warn!(log, "flipchain::test", "kept");

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.contains("kept"));
}

#[test]
fn test_file_logger_reports_unusable_path() {
    let dir = std::env::temp_dir().join(format!("flipchain_log_dir_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    // A directory cannot be opened as the log file
    match FileLogger::create(&dir) {
        Err(Error::BackendError(message)) => assert!(message.contains("cannot open log file"), "{}", message),
        Err(other) => panic!("unexpected {:?}", other),
        Ok(_) => panic!("opening a directory as a log file should fail"),
    }
}

#[test]
fn test_init_with_file_adds_console_and_file_sinks() {
    let path = log_path("init");
    let log = LogRegistry::init_with_file(&path).unwrap();
    assert_eq!(log.sink_count(), 2);
    assert!(path.exists());
}

// ============================================================================
// REGISTRY TESTS
// ============================================================================

#[test]
fn test_init_installs_console_sink() {
    let log = LogRegistry::init();
    assert_eq!(log.sink_count(), 1);
}

#[test]
fn test_silent_registry_has_no_sink() {
    let log = LogRegistry::silent();
    assert_eq!(log.sink_count(), 0);
    // Logging with no sink is a no-op
    crate::engine_info!(log, "test", "dropped");
}

#[test]
fn test_add_sink_receives_entries() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    log.add_sink(sink.clone());

    crate::engine_info!(log, "flipchain::test", "frame {}", 3);
    crate::engine_warn!(log, "flipchain::test", "index repeated");

    assert_eq!(sink.messages(), vec!["frame 3".to_string(), "index repeated".to_string()]);
}

#[test]
fn test_clones_share_sinks() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    let clone = log.clone();
    clone.add_sink(sink.clone());

    crate::engine_debug!(log, "flipchain::test", "from original");
    assert_eq!(sink.messages().len(), 1);
}

#[test]
fn test_shutdown_detaches_sinks() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    log.add_sink(sink.clone());
    log.shutdown();

    crate::engine_info!(log, "flipchain::test", "after shutdown");
    assert_eq!(log.sink_count(), 0);
    assert!(sink.messages().is_empty());
}

#[test]
fn test_min_severity_filters() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    log.add_sink(sink.clone());
    log.set_min_severity(LogSeverity::Warn);

    crate::engine_trace!(log, "flipchain::test", "trace");
    crate::engine_info!(log, "flipchain::test", "info");
    crate::engine_warn!(log, "flipchain::test", "warn");

    assert_eq!(sink.messages(), vec!["warn".to_string()]);
}

// ============================================================================
// ERROR MACROS
// ============================================================================

#[test]
fn test_engine_error_carries_file_line() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    log.add_sink(sink.clone());

    crate::engine_error!(log, "flipchain::test", "boom");

    let entries = sink.entries.lock().unwrap();
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert!(entries[0].file.unwrap().ends_with("log_tests.rs"));
    assert!(entries[0].line.is_some());
}

#[test]
fn test_engine_err_logs_and_builds_backend_error() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    log.add_sink(sink.clone());

    let err = crate::engine_err!(log, "flipchain::test", "bad handle {}", 9);
    assert_eq!(err, Error::BackendError("bad handle 9".to_string()));
    assert_eq!(sink.messages(), vec!["bad handle 9".to_string()]);
}

#[test]
fn test_engine_bail_returns_early() {
    fn bails(log: &LogRegistry) -> crate::error::Result<u32> {
        crate::engine_bail!(log, "flipchain::test", "stop");
    }
    let log = LogRegistry::silent();
    assert!(matches!(bails(&log), Err(Error::BackendError(_))));
}

#[test]
fn test_engine_report_keeps_variant() {
    let log = LogRegistry::silent();
    let sink = CollectingLogger::new();
    log.add_sink(sink.clone());

    let err = crate::engine_report!(log, "flipchain::test", Error::FenceTimeout { value: 4, completed: 3 });
    assert_eq!(err, Error::FenceTimeout { value: 4, completed: 3 });
    assert!(sink.messages()[0].contains("timed out"));
}
