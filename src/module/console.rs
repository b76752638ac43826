//! Leveled logging facade for loader instances
//!
//! `Console` filters `log`/`info`/`debug` calls against a threshold and
//! hands the survivors to a [`LogSink`]. Sinks that can render styled
//! output get the tag and style separately; plain sinks get one flattened
//! `"<tag>: <message>"` line. The default sink forwards to `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Default tag prefixed to every record
pub const TAG: &str = "Initr";

/// Style applied by styled sinks
pub const STYLE: &str = "color:#09d;";

/// Verbosity threshold, in increasing order
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Emit nothing
    Off,
    Log,
    #[default]
    Info,
    Debug,
}

/// One record handed to a sink
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a> {
    pub level: LogLevel,
    pub tag: &'a str,
    /// Present only for styled sinks
    pub style: Option<&'a str>,
    pub message: &'a str,
}

/// Output capability for [`Console`]
pub trait LogSink: Send + Sync {
    /// Can this sink render a separate tag and style?
    fn styled(&self) -> bool {
        false
    }

    fn write(&self, record: &LogRecord<'_>);
}

/// Sink forwarding to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, record: &LogRecord<'_>) {
        match record.level {
            LogLevel::Off => {}
            LogLevel::Log | LogLevel::Info => {
                tracing::info!(target: "initr", tag = record.tag, "{}", record.message)
            }
            LogLevel::Debug => {
                tracing::debug!(target: "initr", tag = record.tag, "{}", record.message)
            }
        }
    }
}

/// Owned copy of a record, kept by [`MemorySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    pub level: LogLevel,
    pub tag: String,
    pub style: Option<String>,
    pub message: String,
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    styled: bool,
    records: Mutex<Vec<CapturedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that advertises styled output
    pub fn with_styling() -> Self {
        Self {
            styled: true,
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.level == level)
            .count()
    }
}

impl LogSink for MemorySink {
    fn styled(&self) -> bool {
        self.styled
    }

    fn write(&self, record: &LogRecord<'_>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedRecord {
                level: record.level,
                tag: record.tag.to_string(),
                style: record.style.map(str::to_string),
                message: record.message.to_string(),
            });
    }
}

/// Leveled logger bound to one loader instance
#[derive(Clone)]
pub struct Console {
    level: LogLevel,
    tag: String,
    sink: Arc<dyn LogSink>,
}

impl Console {
    /// Console writing to `tracing`
    pub fn new(level: LogLevel, tag: impl Into<String>) -> Self {
        Self::with_sink(level, tag, Arc::new(TracingSink))
    }

    pub fn with_sink(level: LogLevel, tag: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            level,
            tag: tag.into(),
            sink,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Would a record at `level` be emitted?
    pub fn enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level <= self.level
    }

    pub fn log(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Log, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Info, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(LogLevel::Debug, message);
    }

    fn emit(&self, level: LogLevel, message: impl fmt::Display) {
        if !self.enabled(level) {
            return;
        }

        let message = message.to_string();
        if self.sink.styled() {
            self.sink.write(&LogRecord {
                level,
                tag: &self.tag,
                style: Some(STYLE),
                message: &message,
            });
        } else {
            let flattened = format!("{}: {}", self.tag, message);
            self.sink.write(&LogRecord {
                level,
                tag: &self.tag,
                style: None,
                message: &flattened,
            });
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("level", &self.level)
            .field("tag", &self.tag)
            .finish()
    }
}
