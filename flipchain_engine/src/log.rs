//! Internal logging system for the Flipchain engine
//!
//! This module provides a flexible logging system with:
//! - Customizable sinks via the Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default, plus an optional plain-text log file
//! - An explicit, cloneable `LogRegistry` handle instead of a process-wide logger
//! - File and line information for detailed ERROR logs
//!
//! Every component that logs receives a `LogRegistry` at construction. The
//! registry is created with [`LogRegistry::init`], extended with
//! [`LogRegistry::add_sink`] and detached with [`LogRegistry::shutdown`].

use colored::*;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

use crate::error::{Error, Result};

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom sinks (in-game console, network, etc.)
///
/// # Example
///
/// ```no_run
/// use flipchain_engine::flipchain::log::{Logger, LogEntry};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, entry: &LogEntry) {
///         eprintln!("{}: {}", entry.source, entry.message);
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    ///
    /// # Arguments
    ///
    /// * `entry` - The log entry to process
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level (Trace, Debug, Info, Warn, Error)
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "flipchain::FrameRenderer", "flipchain::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Very verbose debug information (typically disabled in release)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (critical issues with file:line details)
    Error,
}

/// Default logger implementation using colored console output
///
/// Colors:
/// - Trace: bright_black
/// - Debug: cyan
/// - Info: green
/// - Warn: yellow
/// - Error: red + bold
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl DefaultLogger {
    /// Render an entry without colors (the `FileLogger` line format)
    pub fn format_plain(entry: &LogEntry) -> String {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f");
        let severity = match entry.severity {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        };
        match (entry.file, entry.line) {
            (Some(file), Some(line)) => format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity, entry.source, entry.message, file, line
            ),
            _ => format!("[{}] [{}] [{}] {}", timestamp, severity, entry.source, entry.message),
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        // Format timestamp as YYYY-MM-DD HH:MM:SS.mmm
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                severity_str,
                source,
                entry.message,
                file,
                line
            );
        } else {
            println!(
                "[{}] [{}] [{}] {}",
                timestamp,
                severity_str,
                source,
                entry.message
            );
        }
    }
}

/// Sink appending uncolored lines to a log file
///
/// Lines use [`DefaultLogger::format_plain`]. Every entry is flushed as soon as
/// it is written, so the file is complete up to the last entry even if the
/// process aborts.
pub struct FileLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileLogger {
    /// Default location, relative to the working directory
    pub const DEFAULT_PATH: &'static str = "logs/engine.log";

    /// Open `path` for appending, creating it and its parent directories
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_error = |e: std::io::Error| {
            Error::BackendError(format!("cannot open log file '{}': {}", path.display(), e))
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(open_error)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).map_err(open_error)?;

        Ok(Self { writer: Mutex::new(BufWriter::new(file)), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Logger for FileLogger {
    fn log(&self, entry: &LogEntry) {
        // A sink has nowhere to report its own failures
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", DefaultLogger::format_plain(entry));
            let _ = writer.flush();
        }
    }
}

struct RegistryState {
    sinks: Vec<Arc<dyn Logger>>,
    min_severity: LogSeverity,
}

/// Shared handle to the set of active log sinks
///
/// Cloning the handle is cheap; all clones observe the same sinks.
#[derive(Clone)]
pub struct LogRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl LogRegistry {
    /// Create a registry with the colored console sink attached
    pub fn init() -> Self {
        let registry = Self::silent();
        registry.add_sink(Arc::new(DefaultLogger));
        registry
    }

    /// Create a registry with the console sink and a [`FileLogger`] at `path`
    pub fn init_with_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = FileLogger::create(path)?;
        let registry = Self::init();
        registry.add_sink(Arc::new(file));
        Ok(registry)
    }

    /// Create a registry without any sink
    pub fn silent() -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                sinks: Vec::new(),
                min_severity: LogSeverity::Trace,
            })),
        }
    }

    /// Attach an additional sink
    pub fn add_sink(&self, sink: Arc<dyn Logger>) {
        if let Ok(mut state) = self.state.write() {
            state.sinks.push(sink);
        }
    }

    /// Drop every entry below `severity`
    pub fn set_min_severity(&self, severity: LogSeverity) {
        if let Ok(mut state) = self.state.write() {
            state.min_severity = severity;
        }
    }

    /// Number of attached sinks
    pub fn sink_count(&self) -> usize {
        self.state.read().map(|state| state.sinks.len()).unwrap_or(0)
    }

    /// Detach all sinks. Later log calls are silently discarded.
    pub fn shutdown(&self) {
        if let Ok(mut state) = self.state.write() {
            state.sinks.clear();
        }
    }

    /// Logging entry point for simple logs without file:line
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(&self, severity: LogSeverity, source: &str, message: String) {
        self.dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Logging entry point with file:line information
    ///
    /// Used by engine_error!, engine_err! and engine_report!.
    pub fn log_detailed(
        &self,
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        self.dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(&self, entry: LogEntry) {
        if let Ok(state) = self.state.read() {
            if entry.severity < state.min_severity {
                return;
            }
            for sink in &state.sinks {
                sink.log(&entry);
            }
        }
    }
}

impl std::fmt::Debug for LogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRegistry")
            .field("sinks", &self.sink_count())
            .finish()
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
///
/// # Example
///
/// ```no_run
/// # use flipchain_engine::{engine_trace, flipchain::log::LogRegistry};
/// # let log = LogRegistry::init();
/// engine_trace!(log, "flipchain::FrameRenderer", "Entering render_frame()");
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::flipchain::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! engine_debug {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::flipchain::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```no_run
/// # use flipchain_engine::{engine_info, flipchain::log::LogRegistry};
/// # let log = LogRegistry::init();
/// engine_info!(log, "flipchain::FrameRenderer", "Renderer initialized successfully");
/// ```
#[macro_export]
macro_rules! engine_info {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::flipchain::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! engine_warn {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log(
            $crate::flipchain::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! engine_error {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        $log.log_detailed(
            $crate::flipchain::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and evaluate to `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use flipchain_engine::{engine_err, flipchain::{Error, log::LogRegistry}};
/// # let log = LogRegistry::init();
/// let err: Error = engine_err!(log, "flipchain::vulkan", "Buffer has no allocation");
/// ```
#[macro_export]
macro_rules! engine_err {
    ($log:expr, $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $log.log_detailed(
            $crate::flipchain::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::flipchain::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($log:expr, $source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($log, $source, $($arg)*))
    };
}

/// Log an already built `Error` with file:line information and evaluate to it
///
/// # Example
///
/// ```no_run
/// # use flipchain_engine::{engine_report, flipchain::{Error, log::LogRegistry}};
/// # let log = LogRegistry::init();
/// let err = engine_report!(log, "flipchain::FrameSync", Error::FenceTimeout { value: 3, completed: 2 });
/// ```
#[macro_export]
macro_rules! engine_report {
    ($log:expr, $source:expr, $err:expr) => {{
        let error: $crate::flipchain::Error = $err;
        $log.log_detailed(
            $crate::flipchain::log::LogSeverity::Error,
            $source,
            error.to_string(),
            file!(),
            line!()
        );
        error
    }};
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
