//! Run logger module.
//!
//! Each run writes two line-oriented files into the output directory:
//! - `rename.log`: one `old -> new` line per completed rename
//! - `logging.log`: timestamped, leveled progress and error messages
//!
//! Both files are truncated when the run starts and every line is flushed as
//! soon as it is written. Event lines are also forwarded to `tracing`.

use chrono::{Local, NaiveDateTime};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File name of the rename mapping log.
pub const RENAME_LOG_NAME: &str = "rename.log";

/// File name of the event log.
pub const EVENT_LOG_NAME: &str = "logging.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Severity of an event log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Formats one rename mapping line (without the newline).
pub fn format_rename_line(old: &str, new: &str) -> String {
    format!("{} -> {}", old, new)
}

/// Formats one event log line (without the newline).
pub fn format_event_line(timestamp: NaiveDateTime, level: LogLevel, message: &str) -> String {
    format!(
        "{} [{}] {}",
        timestamp.format(TIMESTAMP_FORMAT),
        level,
        message.trim_end()
    )
}

/// The two log sinks of a single run.
///
/// Writers are mutex-guarded so concurrent encoding jobs never interleave
/// partial lines.
#[derive(Debug)]
pub struct RunLog {
    rename: Mutex<BufWriter<File>>,
    events: Mutex<BufWriter<File>>,
    rename_path: PathBuf,
    event_path: PathBuf,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock leaves a line half-written at worst
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RunLog {
    /// Creates (or truncates) both log files inside `dir`.
    pub fn open(dir: &Path) -> io::Result<Self> {
        let rename_path = dir.join(RENAME_LOG_NAME);
        let event_path = dir.join(EVENT_LOG_NAME);
        let rename = File::create(&rename_path)?;
        let events = File::create(&event_path)?;

        Ok(Self {
            rename: Mutex::new(BufWriter::new(rename)),
            events: Mutex::new(BufWriter::new(events)),
            rename_path,
            event_path,
        })
    }

    pub fn rename_log_path(&self) -> &Path {
        &self.rename_path
    }

    pub fn event_log_path(&self) -> &Path {
        &self.event_path
    }

    /// Records a completed rename. Returns once the line is flushed.
    pub fn rename(&self, old: &str, new: &str) -> io::Result<()> {
        let mut writer = lock(&self.rename);
        writeln!(writer, "{}", format_rename_line(old, new))?;
        writer.flush()
    }

    /// Writes an event line and mirrors it to `tracing`.
    pub fn event(&self, level: LogLevel, message: &str) -> io::Result<()> {
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warning => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }

        let line = format_event_line(Local::now().naive_local(), level, message);
        let mut writer = lock(&self.events);
        writeln!(writer, "{}", line)?;
        writer.flush()
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.event_or_report(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.event_or_report(LogLevel::Warning, message.as_ref());
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.event_or_report(LogLevel::Error, message.as_ref());
    }

    fn event_or_report(&self, level: LogLevel, message: &str) {
        if let Err(e) = self.event(level, message) {
            tracing::error!(
                "Failed to write event log {}: {}",
                self.event_path.display(),
                e
            );
        }
    }

    /// Flushes both sinks.
    pub fn flush(&self) -> io::Result<()> {
        lock(&self.rename).flush()?;
        lock(&self.events).flush()
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
