//! Validators for each configuration section

use super::Validate;
use crate::config::models::*;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

fn non_zero(value: Duration, field: &str) -> Result<(), String> {
    if value.is_zero() {
        return Err(format!("{} must be greater than 0", field));
    }
    Ok(())
}

fn http_url(value: &str, field: &str) -> Result<(), String> {
    let url = Url::parse(value).map_err(|e| format!("{} is not a valid URL: {}", field, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("{} must use http or https", field));
    }
    Ok(())
}

impl Validate for LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        EnvFilter::try_new(&self.level)
            .map_err(|e| format!("invalid level directive '{}': {}", self.level, e))?;
        if self.component.trim().is_empty() {
            return Err("component cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Validate for HttpClientConfig {
    fn validate(&self) -> Result<(), String> {
        non_zero(self.timeout, "timeout")?;
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(format!(
                "jitter_factor must be between 0 and 1, got {}",
                self.jitter_factor
            ));
        }
        if self.base_delay > self.max_delay {
            return Err("base_delay cannot exceed max_delay".to_string());
        }
        if self.user_agent.trim().is_empty() {
            return Err("user_agent cannot be empty".to_string());
        }
        if self.pool.max_active == 0 {
            return Err("pool.max_active must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Validate for CircuitBreakerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("breaker name cannot be empty".to_string());
        }
        if self.failure_threshold == 0 {
            return Err(format!("[{}] failure_threshold must be greater than 0", self.name));
        }
        non_zero(self.timeout, &format!("[{}] timeout", self.name))?;
        non_zero(
            self.monitoring_period,
            &format!("[{}] monitoring_period", self.name),
        )?;

        for spec in &self.expected_errors {
            if let ExpectedErrorSpec::Pattern { pattern } = spec {
                Regex::new(pattern)
                    .map_err(|e| format!("[{}] invalid pattern '{}': {}", self.name, pattern, e))?;
            }
        }

        for route in &self.routes {
            if route.host_contains.is_none() && route.port.is_none() {
                return Err(format!(
                    "[{}] route needs host_contains or port",
                    self.name
                ));
            }
        }
        Ok(())
    }
}

impl Validate for Vec<CircuitBreakerConfig> {
    fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for breaker in self {
            breaker.validate()?;
            if !seen.insert(breaker.name.as_str()) {
                return Err(format!("duplicate breaker name: {}", breaker.name));
            }
        }
        Ok(())
    }
}

impl Validate for HealthConfig {
    fn validate(&self) -> Result<(), String> {
        non_zero(self.check_interval, "check_interval")?;
        if self.max_history_entries == 0 {
            return Err("max_history_entries must be greater than 0".to_string());
        }
        if self.event_capacity == 0 {
            return Err("event_capacity must be greater than 0".to_string());
        }
        if self.searxng.enabled {
            http_url(&self.searxng.url, "searxng.url")?;
            non_zero(self.searxng.timeout, "searxng.timeout")?;
        }
        if self.powershell.enabled {
            if self.powershell.program.trim().is_empty() {
                return Err("powershell.program cannot be empty".to_string());
            }
            non_zero(self.powershell.timeout, "powershell.timeout")?;
        }
        if self.filesystem.enabled {
            non_zero(self.filesystem.timeout, "filesystem.timeout")?;
        }
        if self.dev_server.enabled {
            http_url(&self.dev_server.url, "dev_server.url")?;
            non_zero(self.dev_server.timeout, "dev_server.timeout")?;
        }
        Ok(())
    }
}

impl Validate for CommandSpec {
    fn validate(&self) -> Result<(), String> {
        if self.program.trim().is_empty() {
            return Err("command program cannot be empty".to_string());
        }
        non_zero(self.timeout, "command timeout")
    }
}

impl Validate for ProcessSpec {
    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("process id cannot be empty".to_string());
        }
        match &self.controller {
            ControllerSpec::Docker { container } => {
                if container.trim().is_empty() {
                    return Err(format!("[{}] container cannot be empty", self.id));
                }
            }
            ControllerSpec::Command {
                check,
                start,
                stop,
                stats,
                ..
            } => {
                for command in std::iter::once(check).chain(start).chain(stop).chain(stats) {
                    command
                        .validate()
                        .map_err(|e| format!("[{}] {}", self.id, e))?;
                }
            }
        }
        Ok(())
    }
}

impl Validate for ProcessMonitorConfig {
    fn validate(&self) -> Result<(), String> {
        non_zero(self.check_interval, "check_interval")?;
        non_zero(self.resource_check_interval, "resource_check_interval")?;
        if self.max_restart_history == 0 {
            return Err("max_restart_history must be greater than 0".to_string());
        }

        let mut seen = HashSet::new();
        for process in &self.processes {
            process.validate()?;
            if !seen.insert(process.id.as_str()) {
                return Err(format!("duplicate process id: {}", process.id));
            }
        }
        Ok(())
    }
}

impl Validate for ScraperConfig {
    fn validate(&self) -> Result<(), String> {
        if self.executable.trim().is_empty() {
            return Err("executable cannot be empty".to_string());
        }
        non_zero(self.timeout, "timeout")
    }
}
