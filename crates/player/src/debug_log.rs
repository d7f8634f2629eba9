//! Fire-and-forget diagnostics stream read by the in-app debug console.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Sink for diagnostics. Never read back by the playback engine.
pub trait DebugLog: Send + Sync {
    fn log(&self, level: LogLevel, message: &str, detail: Option<&str>);
}

/// Forwards entries into `tracing` under the `debug_console` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDebugLog;

impl DebugLog for TracingDebugLog {
    fn log(&self, level: LogLevel, message: &str, detail: Option<&str>) {
        let detail = detail.unwrap_or_default();
        match level {
            LogLevel::Debug => tracing::debug!(target: "debug_console", detail, "{}", message),
            LogLevel::Info => tracing::info!(target: "debug_console", detail, "{}", message),
            LogLevel::Warn => tracing::warn!(target: "debug_console", detail, "{}", message),
            LogLevel::Error => tracing::error!(target: "debug_console", detail, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{:>5}] {}",
            self.at.format("%H:%M:%S%.3f"),
            self.level,
            self.message
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Bounded ring buffer of recent entries, oldest dropped first.
#[derive(Debug)]
pub struct MemoryDebugLog {
    entries: Mutex<VecDeque<LogEntry>>,
    capacity: usize,
    mirror_to_tracing: bool,
}

impl MemoryDebugLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            mirror_to_tracing: false,
        }
    }

    /// Also forward every entry to [`TracingDebugLog`].
    pub fn with_tracing(mut self) -> Self {
        self.mirror_to_tracing = true;
        self
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Entries at or above `level`.
    pub fn entries_at_least(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.level >= level)
            .cloned()
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| entry.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl DebugLog for MemoryDebugLog {
    fn log(&self, level: LogLevel, message: &str, detail: Option<&str>) {
        if self.mirror_to_tracing {
            TracingDebugLog.log(level, message, detail);
        }

        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogEntry {
            at: Utc::now(),
            level,
            message: message.to_string(),
            detail: detail.map(str::to_string),
        });
    }
}
