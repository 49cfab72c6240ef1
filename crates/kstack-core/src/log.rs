//! Deployment log context.
//!
//! Components receive a [`DeployLog`] when they are built. Each call emits a
//! `tracing` event for the console and, when a sink is attached, appends a
//! `<timestamp> <LEVEL> <message>` line to it. Sink failures are ignored so the
//! log can never change a pipeline decision.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Error => "ERROR",
        })
    }
}

#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Destination for log records.
pub trait LogSink: Send + Sync {
    fn append(&self, record: &LogRecord);
}

/// Appends formatted records to a file.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Open (or create) the log file in append mode, creating parent directories.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create log directory: {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileSink {
    fn append(&self, record: &LogRecord) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", record);
        }
    }
}

/// Keeps records in memory; used by tests and for inspecting a run.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Messages logged at `level`, in order.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn append(&self, record: &LogRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

/// Cheap-to-clone log handle passed to every component.
#[derive(Clone, Default)]
pub struct DeployLog {
    sink: Option<Arc<dyn LogSink>>,
}

impl fmt::Debug for DeployLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployLog")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl DeployLog {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// A log with no sink; tracing events are still emitted.
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn debug(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "kstack", "{}", message);
        self.append(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "kstack", "{}", message);
        self.append(LogLevel::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(target: "kstack", "{}", message);
        self.append(LogLevel::Error, message);
    }

    /// Log a fatal condition at ERROR and hand it back for propagation.
    pub fn failure<E: fmt::Display>(&self, err: E) -> E {
        self.error(err.to_string());
        err
    }

    fn append(&self, level: LogLevel, message: String) {
        if let Some(sink) = &self.sink {
            sink.append(&LogRecord {
                timestamp: Local::now(),
                level,
                message,
            });
        }
    }
}
