//! Named circuit breakers and URL routing

use super::circuit_breaker::CircuitBreaker;
use super::types::{BreakerRoute, CircuitBreakerConfig, CircuitBreakerStatus};
use crate::utils::error::{Result, SentinelError};
use crate::utils::logging::StructuredLogger;
use std::sync::Arc;
use url::Url;

/// All breakers of the process, in configuration order
pub struct CircuitBreakerRegistry {
    breakers: Vec<Arc<CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(configs: &[CircuitBreakerConfig], logger: Arc<StructuredLogger>) -> Result<Self> {
        let breakers = configs
            .iter()
            .map(|config| CircuitBreaker::new(config.clone(), logger.clone()).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { breakers })
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.iter().find(|b| b.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.breakers.iter().map(|b| b.name().to_string()).collect()
    }

    /// Breaker whose routes match `url`, if any
    pub fn resolve_for_url(&self, url: &str) -> Option<Arc<CircuitBreaker>> {
        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
        let port = parsed.port_or_known_default();

        self.breakers
            .iter()
            .find(|breaker| {
                breaker
                    .config()
                    .routes
                    .iter()
                    .any(|route| route_matches(route, &host, port))
            })
            .cloned()
    }

    pub fn statuses(&self) -> Vec<CircuitBreakerStatus> {
        self.breakers.iter().map(|b| b.status()).collect()
    }

    /// Force-close the named breaker
    pub fn reset(&self, name: &str) -> Result<CircuitBreakerStatus> {
        let breaker = self.require(name)?;
        breaker.force_close();
        Ok(breaker.status())
    }

    /// Force-open the named breaker
    pub fn force_open(&self, name: &str) -> Result<CircuitBreakerStatus> {
        let breaker = self.require(name)?;
        breaker.force_open();
        Ok(breaker.status())
    }

    pub fn start_monitoring(&self) {
        for breaker in &self.breakers {
            breaker.start_monitoring();
        }
    }

    pub fn stop_monitoring(&self) {
        for breaker in &self.breakers {
            breaker.stop_monitoring();
        }
    }

    fn require(&self, name: &str) -> Result<Arc<CircuitBreaker>> {
        self.get(name)
            .ok_or_else(|| SentinelError::not_found(format!("Circuit breaker '{}'", name)))
    }
}

fn route_matches(route: &BreakerRoute, host: &str, port: Option<u16>) -> bool {
    let host_ok = route
        .host_contains
        .as_ref()
        .is_none_or(|needle| host.contains(&needle.to_ascii_lowercase()));
    let port_ok = route.port.is_none_or(|p| port == Some(p));
    host_ok && port_ok
}
