//! Configuration management for the sentinel
//!
//! This module handles loading, validation, and environment overrides of all
//! sentinel configuration.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::Validate;

use crate::utils::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration struct for the sentinel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub http_client: HttpClientConfig,
    pub circuit_breakers: Vec<CircuitBreakerConfig>,
    pub health: HealthConfig,
    pub process: ProcessMonitorConfig,
    pub scraper: ScraperConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            http_client: HttpClientConfig::default(),
            circuit_breakers: default_circuit_breakers(),
            health: HealthConfig::default(),
            process: ProcessMonitorConfig::default(),
            scraper: ScraperConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {:?}", path);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SentinelError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_yaml(&content)?;
        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parse and validate YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| SentinelError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with overrides from the process environment
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `SEARX_URL`, `UI_URL`, `SENTINEL_DATA_DIR`, `SENTINEL_LOG_LEVEL`
    /// and `SENTINEL_LOG_DIR` through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SEARX_URL") {
            self.health.searxng.url = url;
        }
        if let Some(url) = lookup("UI_URL") {
            self.health.dev_server.url = url;
        }
        if let Some(dir) = lookup("SENTINEL_DATA_DIR") {
            self.health.filesystem.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("SENTINEL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("SENTINEL_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        debug!("Validating configuration");

        self.logging
            .validate()
            .map_err(|e| SentinelError::Config(format!("Logging config error: {}", e)))?;

        self.http_client
            .validate()
            .map_err(|e| SentinelError::Config(format!("HTTP client config error: {}", e)))?;

        self.circuit_breakers
            .validate()
            .map_err(|e| SentinelError::Config(format!("Circuit breaker config error: {}", e)))?;

        self.health
            .validate()
            .map_err(|e| SentinelError::Config(format!("Health config error: {}", e)))?;

        self.process
            .validate()
            .map_err(|e| SentinelError::Config(format!("Process config error: {}", e)))?;

        self.scraper
            .validate()
            .map_err(|e| SentinelError::Config(format!("Scraper config error: {}", e)))?;

        debug!("Configuration validation completed");
        Ok(())
    }

    /// Convert to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| SentinelError::Config(format!("Failed to serialize config to YAML: {}", e)))
    }
}
