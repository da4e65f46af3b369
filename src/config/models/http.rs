//! HTTP client configuration

use super::duration_ms;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry and request settings for the HTTP client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Per-request timeout
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// Cap on the exponential delay
    #[serde(with = "duration_ms")]
    pub max_delay: Duration,
    /// Random extra delay as a fraction of the computed delay
    pub jitter_factor: f64,
    pub user_agent: String,
    pub accept_invalid_certs: bool,
    pub pool: PoolConfig,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            jitter_factor: 0.1,
            user_agent: "SearxNG-Collector/3.0".to_string(),
            accept_invalid_certs: false,
            pool: PoolConfig::default(),
        }
    }
}

/// Connection pool limits, applied to each scheme separately
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Concurrently active requests
    pub max_active: usize,
    pub max_idle_per_host: usize,
    #[serde(with = "duration_ms")]
    pub idle_timeout: Duration,
    #[serde(with = "duration_ms")]
    pub keep_alive: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 50,
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(30),
            keep_alive: Duration::from_secs(30),
        }
    }
}
