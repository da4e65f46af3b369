//! Logging configuration

use crate::utils::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive for console output
    pub level: String,
    /// Emit console output as JSON
    pub json: bool,
    /// Component name stamped on every entry and used as the file prefix
    pub component: String,
    /// Directory for daily log files; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Minimum level written to files
    pub file_level: LogLevel,
    /// Log files older than this are removed by `cleanup`
    pub retention_days: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            component: "sentinel".to_string(),
            log_dir: Some(PathBuf::from("data/logs")),
            file_level: LogLevel::Debug,
            retention_days: 7,
        }
    }
}
