//! Circuit breaker configuration

use super::duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One breaker guarding a named dependency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    pub name: String,
    /// Counted failures that open the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial request
    #[serde(with = "duration_ms", default = "default_open_timeout")]
    pub timeout: Duration,
    /// Interval of the status/recovery task
    #[serde(with = "duration_ms", default = "default_monitoring_period")]
    pub monitoring_period: Duration,
    /// Failures matching any of these are not counted
    #[serde(default)]
    pub expected_errors: Vec<ExpectedErrorSpec>,
    /// URLs routed through this breaker by the HTTP client
    #[serde(default)]
    pub routes: Vec<BreakerRoute>,
}

impl CircuitBreakerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure_threshold: default_failure_threshold(),
            timeout: default_open_timeout(),
            monitoring_period: default_monitoring_period(),
            expected_errors: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Guards the SearxNG search backend
    pub fn searxng() -> Self {
        Self {
            name: "searxng".to_string(),
            failure_threshold: 3,
            timeout: Duration::from_secs(30),
            monitoring_period: Duration::from_secs(10),
            expected_errors: vec![
                ExpectedErrorSpec::contains("ECONNREFUSED"),
                ExpectedErrorSpec::contains("timeout"),
            ],
            routes: vec![
                BreakerRoute {
                    host_contains: Some("searx".to_string()),
                    port: None,
                },
                BreakerRoute {
                    host_contains: None,
                    port: Some(8888),
                },
            ],
        }
    }

    /// Guards the PowerShell scraping scripts
    pub fn powershell() -> Self {
        Self {
            name: "powershell".to_string(),
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(15),
            expected_errors: vec![
                ExpectedErrorSpec::contains("execution policy"),
                ExpectedErrorSpec::contains("script not found"),
            ],
            routes: Vec::new(),
        }
    }
}

/// Config form of an expected-error matcher
///
/// ```yaml
/// expected_errors:
///   - contains: ECONNREFUSED
///   - pattern: "(?i)timed? ?out"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedErrorSpec {
    Contains { contains: String },
    Pattern { pattern: String },
}

impl ExpectedErrorSpec {
    pub fn contains(text: impl Into<String>) -> Self {
        ExpectedErrorSpec::Contains {
            contains: text.into(),
        }
    }

    pub fn pattern(regex: impl Into<String>) -> Self {
        ExpectedErrorSpec::Pattern {
            pattern: regex.into(),
        }
    }
}

/// URL selector; every field that is set must match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerRoute {
    #[serde(default)]
    pub host_contains: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

pub fn default_circuit_breakers() -> Vec<CircuitBreakerConfig> {
    vec![
        CircuitBreakerConfig::searxng(),
        CircuitBreakerConfig::powershell(),
    ]
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_monitoring_period() -> Duration {
    Duration::from_secs(10)
}
