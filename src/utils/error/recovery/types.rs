//! Types for the circuit breaker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::config::{BreakerRoute, CircuitBreakerConfig, ExpectedErrorSpec};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, requests flow normally
    #[default]
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, the next request is a trial
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifetime counters of one breaker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerStats {
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    /// Requests rejected while the circuit was open
    pub total_timeouts: u64,
    pub total_circuit_open_events: u64,
    pub average_response_time_ms: f64,
    pub last_response: Option<DateTime<Utc>>,
}

impl BreakerStats {
    /// Two-sample moving average
    pub(super) fn record_response_time(&mut self, millis: f64) {
        self.average_response_time_ms = if self.average_response_time_ms == 0.0 {
            millis
        } else {
            (self.average_response_time_ms + millis) / 2.0
        };
    }
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerStatus {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub next_attempt: Option<DateTime<Utc>>,
    pub stats: BreakerStats,
    pub is_healthy: bool,
    pub time_until_next_attempt_ms: u64,
}
