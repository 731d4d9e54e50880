//! Structured run log.
//!
//! A [`RunLogger`] is handed to each orchestrator run and fans every entry out
//! to the sinks the caller picked: the terminal, the per-run log file under
//! `logs/`, or an in-memory buffer. Entries are mirrored to `tracing` as well.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::model::EntityKind;

/// Name of the in-progress log file inside `logs/`.
pub const ACTIVE_LOG_FILE: &str = "instancelog.txt";

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Success => "OK",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// One line of the run log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub kind: Option<EntityKind>,
    pub message: String,
}

impl LogEntry {
    /// Plain-text rendering used by the file sink.
    #[must_use]
    pub fn to_line(&self) -> String {
        match self.kind {
            Some(kind) => format!(
                "{} [{}] [{}] {}",
                self.timestamp.to_rfc3339(),
                self.level.as_str(),
                kind,
                self.message
            ),
            None => format!(
                "{} [{}] {}",
                self.timestamp.to_rfc3339(),
                self.level.as_str(),
                self.message
            ),
        }
    }
}

/// Destination for run log entries.
pub trait LogSink: Send + Sync {
    fn write(&self, entry: &LogEntry);

    /// Called once when the run ends. Returns the final path of any file written.
    fn finish(&self, _run_prefix: &str) -> Option<PathBuf> {
        None
    }
}

/// Colored output on stderr.
#[derive(Debug, Default)]
pub struct TerminalSink {
    /// Hide info lines, keep warnings and errors.
    quiet: bool,
}

impl TerminalSink {
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl LogSink for TerminalSink {
    fn write(&self, entry: &LogEntry) {
        if self.quiet && entry.level < LogLevel::Warning {
            return;
        }
        let tag = match entry.level {
            LogLevel::Info => "•".dimmed(),
            LogLevel::Success => "✓".green(),
            LogLevel::Warning => "!".yellow().bold(),
            LogLevel::Error => "✗".red().bold(),
        };
        match entry.kind {
            Some(kind) => eprintln!("{tag} {} {}", kind.label().cyan(), entry.message),
            None => eprintln!("{tag} {}", entry.message),
        }
    }
}

/// Appends plain-text lines to `logs/instancelog.txt`.
///
/// On finish the file is renamed to `{prefix}-{YYYYMMDD-HHMMSS}.txt`.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileSink {
    /// Open (or create) the active log file in `logs_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn create(logs_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(logs_dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(logs_dir.join(ACTIVE_LOG_FILE))?;
        Ok(Self {
            dir: logs_dir.to_path_buf(),
            file: Mutex::new(Some(file)),
        })
    }

    fn active_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_LOG_FILE)
    }
}

impl LogSink for FileSink {
    fn write(&self, entry: &LogEntry) {
        let Ok(mut guard) = self.file.lock() else {
            return;
        };
        if let Some(file) = guard.as_mut() {
            if let Err(e) = writeln!(file, "{}", entry.to_line()) {
                tracing::warn!(error = %e, "Failed to append to run log");
            }
        }
    }

    fn finish(&self, run_prefix: &str) -> Option<PathBuf> {
        let mut guard = self.file.lock().ok()?;
        let file = guard.take()?;
        if let Err(e) = file.sync_all() {
            tracing::warn!(error = %e, "Failed to flush run log");
        }
        drop(file);

        let stamp = Local::now().format("%Y%m%d-%H%M%S");
        let target = self.dir.join(format!("{run_prefix}-{stamp}.txt"));
        match fs::rename(self.active_path(), &target) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to rename run log");
                None
            }
        }
    }
}

/// Shared in-memory buffer of entries.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages at one level.
    #[must_use]
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Run-scoped logger fanning entries out to its sinks.
#[derive(Default)]
pub struct RunLogger {
    sinks: Vec<Box<dyn LogSink>>,
}

impl std::fmt::Debug for RunLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLogger")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl RunLogger {
    /// A logger with no sinks; entries only reach `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.add_sink(sink);
        self
    }

    pub fn add_sink(&mut self, sink: impl LogSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn log(&self, level: LogLevel, kind: Option<EntityKind>, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            kind,
            message: message.into(),
        };
        let kind_name = entry.kind.map_or("-", |k| k.as_str());
        match level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(kind = kind_name, "{}", entry.message);
            }
            LogLevel::Warning => tracing::warn!(kind = kind_name, "{}", entry.message),
            LogLevel::Error => tracing::error!(kind = kind_name, "{}", entry.message),
        }
        for sink in &self.sinks {
            sink.write(&entry);
        }
    }

    pub fn info(&self, kind: EntityKind, message: impl Into<String>) {
        self.log(LogLevel::Info, Some(kind), message);
    }

    pub fn success(&self, kind: EntityKind, message: impl Into<String>) {
        self.log(LogLevel::Success, Some(kind), message);
    }

    pub fn warning(&self, kind: EntityKind, message: impl Into<String>) {
        self.log(LogLevel::Warning, Some(kind), message);
    }

    pub fn error(&self, kind: EntityKind, message: impl Into<String>) {
        self.log(LogLevel::Error, Some(kind), message);
    }

    /// Run-level line not tied to a kind.
    pub fn run(&self, level: LogLevel, message: impl Into<String>) {
        self.log(level, None, message);
    }

    /// Close every sink. Returns the final log file path, if one was written.
    pub fn finish(&self, run_prefix: &str) -> Option<PathBuf> {
        self.sinks
            .iter()
            .filter_map(|s| s.finish(run_prefix))
            .last()
    }
}
