//! Retry classification and backoff

use super::types::HttpClientConfig;
use crate::utils::error::{NetworkErrorCode, SentinelError};
use std::error::Error as StdError;
use std::time::Duration;

/// Statuses worth another attempt; any 5xx also qualifies
const RETRYABLE_STATUSES: [u16; 5] = [408, 429, 502, 503, 504];

pub fn is_retryable_status(status: u16) -> bool {
    status >= 500 || RETRYABLE_STATUSES.contains(&status)
}

/// Whether a failed attempt should be retried
///
/// Circuit-open rejections are never retried.
pub fn should_retry(error: Option<&SentinelError>, status: Option<u16>) -> bool {
    if let Some(error) = error {
        if error.is_circuit_open() {
            return false;
        }
        if let SentinelError::HttpStatus { status, .. } = error {
            return is_retryable_status(*status);
        }
        if error.network_code().is_some_and(|code| code.is_retryable()) {
            return true;
        }
        let message = error.to_string();
        return NetworkErrorCode::RETRYABLE
            .iter()
            .any(|code| message.contains(code.as_str()));
    }

    status.is_some_and(is_retryable_status)
}

/// Exponential backoff with proportional jitter
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpClientConfig) -> Self {
        Self {
            base_delay: config.base_delay,
            max_delay: config.max_delay,
            jitter_factor: config.jitter_factor,
        }
    }

    /// `min(base * 2^(attempt-1), max)` for 1-indexed attempts
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// Backoff before the attempt after `attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, rand::random::<f64>())
    }

    /// Backoff with an explicit random sample in `[0, 1)`
    pub fn delay_with(&self, attempt: u32, random: f64) -> Duration {
        let delay = self.base_delay_for(attempt).as_millis() as f64;
        let jitter = (self.jitter_factor * delay * random).floor();
        Duration::from_millis((delay + jitter) as u64)
    }
}

/// Map a transport failure onto a typed network error
pub fn classify_transport_error(error: &reqwest::Error, timeout: Duration) -> SentinelError {
    if error.is_timeout() {
        return SentinelError::network(
            NetworkErrorCode::TimedOut,
            format!("request timeout after {}ms", timeout.as_millis()),
        );
    }

    let message = error_chain(error);

    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            let code = NetworkErrorCode::from_io_kind(io.kind());
            if code != NetworkErrorCode::Other {
                return SentinelError::network(code, message);
            }
        }
        source = cause.source();
    }

    let lowered = message.to_ascii_lowercase();
    let code = if lowered.contains("temporary failure in name resolution") {
        NetworkErrorCode::DnsRetry
    } else if lowered.contains("dns error")
        || lowered.contains("failed to lookup address")
        || lowered.contains("name or service not known")
        || lowered.contains("no such host")
    {
        NetworkErrorCode::NotFound
    } else if lowered.contains("connection reset") || lowered.contains("connection closed") {
        NetworkErrorCode::ConnectionReset
    } else if lowered.contains("connection refused") {
        NetworkErrorCode::ConnectionRefused
    } else {
        NetworkErrorCode::Other
    };
    SentinelError::network(code, message)
}

/// Display an error with all of its sources
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
