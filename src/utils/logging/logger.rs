//! Structured logger with correlation ID contexts
//!
//! Every entry is mirrored to `tracing` for console output and, when a log
//! directory is configured, appended as a JSON line to a daily file.

use super::context::CorrelationStore;
use super::entry::{LogEntry, LogLevel};
use super::file_logging::DailyFileWriter;
use crate::config::LoggingConfig;
use crate::utils::error::Result;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::fmt::Display;
use tracing::{debug, error, info, warn};

/// Process-wide structured logger, shared as `Arc<StructuredLogger>`
pub struct StructuredLogger {
    component: String,
    file_level: LogLevel,
    contexts: CorrelationStore,
    file: Option<DailyFileWriter>,
}

impl StructuredLogger {
    /// Console-only logger
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            file_level: LogLevel::Debug,
            contexts: CorrelationStore::new(),
            file: None,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Result<Self> {
        let mut logger = Self::new(config.component.clone());
        logger.file_level = config.file_level;
        if let Some(dir) = &config.log_dir {
            logger = logger.with_file_output(dir)?;
        }
        Ok(logger)
    }

    /// Append entries to daily files under `dir`
    pub fn with_file_output(mut self, dir: impl Into<std::path::PathBuf>) -> Result<Self> {
        self.file = Some(DailyFileWriter::new(dir, self.component.clone())?);
        Ok(self)
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    // ==================== Correlation contexts ====================

    pub fn generate_correlation_id(&self) -> String {
        CorrelationStore::generate_id()
    }

    /// Open a context and return its ID
    pub fn create_context(&self) -> String {
        self.contexts.create(None)
    }

    /// Open a context under a caller-supplied ID
    pub fn create_context_with(&self, correlation_id: &str) -> String {
        self.contexts.create(Some(correlation_id))
    }

    pub fn update_context(&self, correlation_id: &str, metadata: Value) {
        if let Value::Object(map) = metadata {
            self.contexts.update(correlation_id, map);
        }
    }

    pub fn release_context(&self, correlation_id: &str) {
        self.contexts.release(correlation_id);
    }

    pub fn active_contexts(&self) -> usize {
        self.contexts.len()
    }

    // ==================== Core ====================

    pub fn format_entry(
        &self,
        level: LogLevel,
        message: &str,
        correlation_id: Option<&str>,
        metadata: Value,
    ) -> LogEntry {
        let context = correlation_id.and_then(|id| self.contexts.get(id));

        let mut merged = context
            .as_ref()
            .map(|c| c.metadata.clone())
            .unwrap_or_default();
        match metadata {
            Value::Object(map) => merged.extend(map),
            Value::Null => {}
            other => {
                merged.insert("value".to_string(), other);
            }
        }

        LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.to_string(),
            correlation_id: correlation_id.map(str::to_string),
            component: self.component.clone(),
            metadata: merged,
            duration: context.map(|c| c.started.elapsed().as_millis() as u64),
        }
    }

    pub fn log(
        &self,
        level: LogLevel,
        message: &str,
        correlation_id: Option<&str>,
        metadata: Value,
    ) -> LogEntry {
        let entry = self.format_entry(level, message, correlation_id, metadata);

        emit_console(&entry);

        if let Some(file) = &self.file {
            if entry.level.passes(self.file_level) {
                if let Err(e) = file.write(&entry) {
                    warn!("Failed to write log entry to file: {}", e);
                }
            }
        }

        entry
    }

    pub fn error(&self, message: &str, correlation_id: Option<&str>, metadata: Value) -> LogEntry {
        self.log(LogLevel::Error, message, correlation_id, metadata)
    }

    pub fn warn(&self, message: &str, correlation_id: Option<&str>, metadata: Value) -> LogEntry {
        self.log(LogLevel::Warn, message, correlation_id, metadata)
    }

    pub fn info(&self, message: &str, correlation_id: Option<&str>, metadata: Value) -> LogEntry {
        self.log(LogLevel::Info, message, correlation_id, metadata)
    }

    pub fn debug(&self, message: &str, correlation_id: Option<&str>, metadata: Value) -> LogEntry {
        self.log(LogLevel::Debug, message, correlation_id, metadata)
    }

    pub fn success(&self, message: &str, correlation_id: Option<&str>, metadata: Value) -> LogEntry {
        self.log(LogLevel::Success, message, correlation_id, metadata)
    }

    pub fn health(&self, message: &str, correlation_id: Option<&str>, metadata: Value) -> LogEntry {
        self.log(LogLevel::Health, message, correlation_id, metadata)
    }

    pub fn performance(
        &self,
        message: &str,
        correlation_id: Option<&str>,
        metadata: Value,
    ) -> LogEntry {
        self.log(LogLevel::Performance, message, correlation_id, metadata)
    }

    // ==================== Domain helpers ====================

    pub fn network_request(
        &self,
        method: &str,
        url: &str,
        correlation_id: Option<&str>,
        metadata: Value,
    ) -> LogEntry {
        let mut fields = object(metadata);
        fields.insert("type".into(), json!("network_request"));
        fields.insert("method".into(), json!(method));
        fields.insert("url".into(), json!(url));
        self.info(
            &format!("{} {}", method, url),
            correlation_id,
            Value::Object(fields),
        )
    }

    pub fn network_response(
        &self,
        method: &str,
        url: &str,
        status_code: u16,
        duration_ms: u64,
        correlation_id: Option<&str>,
        metadata: Value,
    ) -> LogEntry {
        let level = match status_code {
            400.. => LogLevel::Error,
            300..=399 => LogLevel::Warn,
            _ => LogLevel::Info,
        };
        let mut fields = object(metadata);
        fields.insert("type".into(), json!("network_response"));
        fields.insert("method".into(), json!(method));
        fields.insert("url".into(), json!(url));
        fields.insert("statusCode".into(), json!(status_code));
        fields.insert("duration".into(), json!(duration_ms));
        self.log(
            level,
            &format!("{} {} - {}", method, url, status_code),
            correlation_id,
            Value::Object(fields),
        )
    }

    pub fn network_error(
        &self,
        method: &str,
        url: &str,
        error: &dyn Display,
        correlation_id: Option<&str>,
        metadata: Value,
    ) -> LogEntry {
        let mut fields = object(metadata);
        fields.insert("type".into(), json!("network_error"));
        fields.insert("method".into(), json!(method));
        fields.insert("url".into(), json!(url));
        fields.insert("error".into(), json!(error.to_string()));
        self.error(
            &format!("{} {} - {}", method, url, error),
            correlation_id,
            Value::Object(fields),
        )
    }

    pub fn connection_health(
        &self,
        service: &str,
        status: &str,
        details: Value,
        correlation_id: Option<&str>,
    ) -> LogEntry {
        self.health(
            &format!("{} - {}", service, status),
            correlation_id,
            json!({
                "type": "connection_health",
                "service": service,
                "status": status,
                "details": details,
            }),
        )
    }

    pub fn circuit_breaker_event(
        &self,
        service: &str,
        event: &str,
        details: Value,
        correlation_id: Option<&str>,
    ) -> LogEntry {
        self.warn(
            &format!("Circuit Breaker [{}] - {}", service, event),
            correlation_id,
            json!({
                "type": "circuit_breaker",
                "service": service,
                "event": event,
                "details": details,
            }),
        )
    }

    /// Remove log files older than `days_to_keep` days
    pub fn cleanup(&self, days_to_keep: u64) {
        let Some(file) = &self.file else {
            return;
        };
        match file.cleanup(days_to_keep) {
            Ok(removed) => {
                for path in removed {
                    self.info(
                        &format!("Cleaned up old log file: {}", path.display()),
                        None,
                        Value::Null,
                    );
                }
            }
            Err(e) => {
                self.error(
                    "Failed to cleanup logs",
                    None,
                    json!({ "error": e.to_string() }),
                );
            }
        }
    }
}

fn object(metadata: Value) -> Map<String, Value> {
    match metadata {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

fn emit_console(entry: &LogEntry) {
    let correlation_id = entry.correlation_id.as_deref().unwrap_or("-");
    let metadata = if entry.metadata.is_empty() {
        String::new()
    } else {
        Value::Object(entry.metadata.clone()).to_string()
    };
    let kind = entry.level.as_str();

    match entry.level {
        LogLevel::Error => error!(
            correlation_id,
            component = %entry.component,
            duration_ms = entry.duration,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Warn => warn!(
            correlation_id,
            component = %entry.component,
            duration_ms = entry.duration,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Debug => debug!(
            correlation_id,
            component = %entry.component,
            duration_ms = entry.duration,
            metadata = %metadata,
            "{}",
            entry.message
        ),
        LogLevel::Info | LogLevel::Success | LogLevel::Health | LogLevel::Performance => info!(
            correlation_id,
            kind,
            component = %entry.component,
            duration_ms = entry.duration,
            metadata = %metadata,
            "{}",
            entry.message
        ),
    }
}
