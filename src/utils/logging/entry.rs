//! Log levels and entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log levels understood by the structured logger
///
/// `Success`, `Health` and `Performance` are informational levels with their
/// own tag so they can be filtered in the log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Success,
    Health,
    Performance,
}

impl LogLevel {
    /// Severity rank, lower is more severe
    pub fn rank(&self) -> u8 {
        match self {
            LogLevel::Error => 0,
            LogLevel::Warn => 1,
            LogLevel::Info | LogLevel::Success | LogLevel::Health | LogLevel::Performance => 2,
            LogLevel::Debug => 3,
        }
    }

    /// Whether an entry at this level passes a minimum level
    pub fn passes(&self, minimum: LogLevel) -> bool {
        self.rank() <= minimum.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Success => "SUCCESS",
            LogLevel::Health => "HEALTH",
            LogLevel::Performance => "PERFORMANCE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "trace" => Ok(LogLevel::Debug),
            "success" => Ok(LogLevel::Success),
            "health" => Ok(LogLevel::Health),
            "performance" => Ok(LogLevel::Performance),
            other => Err(format!("Unknown log level: {}", other)),
        }
    }
}

/// One structured log line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub correlation_id: Option<String>,
    pub component: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Milliseconds since the correlation context was created
    pub duration: Option<u64>,
}
