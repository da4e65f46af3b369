//! Error types for the sentinel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias for the sentinel
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Main error type for the sentinel
#[derive(Error, Debug)]
pub enum SentinelError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failures (connection reset, refused, DNS, timeouts)
    #[error("Network error ({code}): {message}")]
    Network {
        code: NetworkErrorCode,
        message: String,
    },

    /// Response carried a status that is treated as a failure
    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Request rejected by an open circuit breaker
    #[error("Circuit breaker [{name}] is OPEN. Next attempt at {}", .next_attempt.to_rfc3339())]
    CircuitOpen {
        name: String,
        next_attempt: DateTime<Utc>,
    },

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Unknown service, process or breaker
    #[error("Not found: {0}")]
    NotFound(String),

    /// Health check reported failure
    #[error("{0}")]
    CheckFailed(String),

    /// External command failures
    #[error("{0}")]
    Command(String),

    /// Operation not supported by the target
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Component has been shut down
    #[error("Shut down: {0}")]
    Shutdown(String),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport error codes, named after the socket errors they describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkErrorCode {
    ConnectionReset,
    /// Host name did not resolve
    NotFound,
    ConnectionRefused,
    TimedOut,
    HostUnreachable,
    NetworkUnreachable,
    /// Temporary DNS failure
    DnsRetry,
    Other,
}

impl NetworkErrorCode {
    /// Codes the HTTP client retries
    pub const RETRYABLE: [NetworkErrorCode; 7] = [
        NetworkErrorCode::ConnectionReset,
        NetworkErrorCode::NotFound,
        NetworkErrorCode::ConnectionRefused,
        NetworkErrorCode::TimedOut,
        NetworkErrorCode::HostUnreachable,
        NetworkErrorCode::NetworkUnreachable,
        NetworkErrorCode::DnsRetry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkErrorCode::ConnectionReset => "ECONNRESET",
            NetworkErrorCode::NotFound => "ENOTFOUND",
            NetworkErrorCode::ConnectionRefused => "ECONNREFUSED",
            NetworkErrorCode::TimedOut => "ETIMEDOUT",
            NetworkErrorCode::HostUnreachable => "EHOSTUNREACH",
            NetworkErrorCode::NetworkUnreachable => "ENETUNREACH",
            NetworkErrorCode::DnsRetry => "EAI_AGAIN",
            NetworkErrorCode::Other => "EOTHER",
        }
    }

    pub fn is_retryable(&self) -> bool {
        Self::RETRYABLE.contains(self)
    }

    /// Map an IO error kind onto a code
    pub fn from_io_kind(kind: std::io::ErrorKind) -> Self {
        use std::io::ErrorKind;
        match kind {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe => {
                NetworkErrorCode::ConnectionReset
            }
            ErrorKind::ConnectionRefused => NetworkErrorCode::ConnectionRefused,
            ErrorKind::TimedOut => NetworkErrorCode::TimedOut,
            ErrorKind::HostUnreachable => NetworkErrorCode::HostUnreachable,
            ErrorKind::NetworkUnreachable => NetworkErrorCode::NetworkUnreachable,
            _ => NetworkErrorCode::Other,
        }
    }
}

impl fmt::Display for NetworkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
