//! Host log forwarding
//!
//! The engine logs through `tracing`. A host that wants those diagnostics in
//! its own pipeline (browser console, OSLog, Logcat) supplies a [`LoggerSink`];
//! `core_runtime::logging` converts each surviving event into a [`LogEntry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One engine diagnostic, flattened for the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Emitting module, e.g. `core_playback::player`.
    pub target: String,
    pub message: String,
    /// Event fields such as `session`, `index` or `detail`.
    pub fields: HashMap<String, String>,
    /// Innermost span, e.g. `play`.
    pub span: Option<String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
            span: None,
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Receives engine diagnostics on the host side.
///
/// Stream URIs arrive with their query string already redacted.
///
/// ```ignore
/// struct Console;
///
/// #[async_trait::async_trait]
/// impl LoggerSink for Console {
///     async fn log(&self, entry: LogEntry) -> Result<()> {
///         println!("{:?} {}: {}", entry.level, entry.target, entry.message);
///         Ok(())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Entries below this level are dropped before conversion.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}
