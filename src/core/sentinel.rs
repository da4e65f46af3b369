//! Composition root wiring every component together

use crate::config::Config;
use crate::core::health::{HealthMonitor, HealthSnapshot, ServiceRecord, builtin_services};
use crate::core::process::{ProcessMonitor, ProcessRecord, RestartHistoryEntry};
use crate::services::scraper::{ScrapeInvocation, ScriptOutput, ScriptRunner};
use crate::utils::error::{CircuitBreakerRegistry, CircuitBreakerStatus, Result};
use crate::utils::logging::StructuredLogger;
use crate::utils::net::{ConnectionStats, RetryingHttpClient};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Everything an operator dashboard shows at once
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub timestamp: DateTime<Utc>,
    pub overall: HealthSnapshot,
    pub services: Vec<ServiceRecord>,
    pub processes: Vec<ProcessRecord>,
    pub circuit_breakers: Vec<CircuitBreakerStatus>,
    pub connections: ConnectionStats,
}

/// The resilience layer of the collector
pub struct Sentinel {
    config: Config,
    logger: Arc<StructuredLogger>,
    breakers: Arc<CircuitBreakerRegistry>,
    http: Arc<RetryingHttpClient>,
    health: Arc<HealthMonitor>,
    processes: Arc<ProcessMonitor>,
    scripts: ScriptRunner,
}

impl Sentinel {
    /// Build every component from `config`
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let logger = Arc::new(StructuredLogger::from_config(&config.logging)?);
        let breakers = Arc::new(CircuitBreakerRegistry::new(
            &config.circuit_breakers,
            logger.clone(),
        )?);
        let http = Arc::new(RetryingHttpClient::new(
            config.http_client.clone(),
            Some(breakers.clone()),
            logger.clone(),
        )?);

        let health = Arc::new(HealthMonitor::new(
            config.health.clone(),
            Some(breakers.clone()),
            logger.clone(),
        )?);
        for service in builtin_services(&config.health, http.clone()) {
            health.register(service);
        }

        let processes = Arc::new(ProcessMonitor::from_config(
            config.process.clone(),
            logger.clone(),
        ));

        let scripts = ScriptRunner::new(
            config.scraper.clone(),
            breakers.get("powershell"),
            logger.clone(),
        );

        info!(
            services = health.services().len(),
            processes = processes.processes().len(),
            breakers = breakers.names().len(),
            "Sentinel initialized"
        );

        Ok(Self {
            config,
            logger,
            breakers,
            http,
            health,
            processes,
            scripts,
        })
    }

    /// Start breaker monitoring, health polling and process supervision
    ///
    /// Connection pools closed by an earlier [`stop`](Self::stop) are reopened.
    pub fn start(&self) -> Result<()> {
        self.http.reopen()?;
        self.logger.cleanup(self.config.logging.retention_days);
        self.breakers.start_monitoring();
        self.health.start();
        self.processes.start(Some(self.health.subscribe()));
        self.logger.success(
            "Sentinel started",
            None,
            json!({ "breakers": self.breakers.names() }),
        );
        Ok(())
    }

    /// Stop everything in reverse start order and close the HTTP pools
    pub fn stop(&self) {
        self.processes.stop();
        self.health.stop();
        self.breakers.stop_monitoring();
        self.http.shutdown();
        self.logger.info("Sentinel stopped", None, Value::Null);
    }

    // ==================== Components ====================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn logger(&self) -> &Arc<StructuredLogger> {
        &self.logger
    }

    pub fn breakers(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.breakers
    }

    pub fn http_client(&self) -> &Arc<RetryingHttpClient> {
        &self.http
    }

    pub fn health_monitor(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn process_monitor(&self) -> &Arc<ProcessMonitor> {
        &self.processes
    }

    pub fn script_runner(&self) -> &ScriptRunner {
        &self.scripts
    }

    // ==================== Read accessors ====================

    pub fn status_report(&self) -> StatusReport {
        StatusReport {
            timestamp: Utc::now(),
            overall: self.health.overall_health(),
            services: self.health.services(),
            processes: self.processes.processes(),
            circuit_breakers: self.breakers.statuses(),
            connections: self.http.connection_stats(),
        }
    }

    pub fn services(&self) -> Vec<ServiceRecord> {
        self.health.services()
    }

    pub fn service(&self, id: &str) -> Result<ServiceRecord> {
        self.health.service(id)
    }

    pub fn health_history(&self, limit: usize) -> Vec<HealthSnapshot> {
        self.health.history(limit)
    }

    pub fn circuit_breakers(&self) -> Vec<CircuitBreakerStatus> {
        self.breakers.statuses()
    }

    pub fn processes(&self) -> Vec<ProcessRecord> {
        self.processes.processes()
    }

    pub fn process(&self, id: &str) -> Result<ProcessRecord> {
        self.processes.process(id)
    }

    pub fn restart_history(&self, limit: usize) -> Vec<RestartHistoryEntry> {
        self.processes.restart_history(limit)
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        self.http.connection_stats()
    }

    // ==================== Actions ====================

    pub async fn force_check(&self, service_id: &str) -> Result<ServiceRecord> {
        self.health.force_check(service_id).await
    }

    pub async fn force_check_all(&self) -> HealthSnapshot {
        self.health.perform_health_check().await
    }

    pub fn reset_circuit_breaker(&self, name: &str) -> Result<CircuitBreakerStatus> {
        self.breakers.reset(name)
    }

    pub fn force_open_circuit_breaker(&self, name: &str) -> Result<CircuitBreakerStatus> {
        self.breakers.force_open(name)
    }

    pub async fn start_process(&self, id: &str) -> Result<Option<RestartHistoryEntry>> {
        self.processes.start_process(id).await
    }

    pub async fn stop_process(&self, id: &str) -> Result<ProcessRecord> {
        self.processes.stop_process(id).await
    }

    pub fn reset_restart_count(&self, id: &str) -> Result<ProcessRecord> {
        self.processes.reset_restart_count(id)
    }

    /// Run a scraping script under the `powershell` breaker
    pub async fn run_scrape(&self, invocation: &ScrapeInvocation) -> Result<ScriptOutput> {
        let correlation_id = self.logger.create_context();
        let result = self.scripts.run(invocation, Some(&correlation_id)).await;
        self.logger.release_context(&correlation_id);
        result
    }
}

impl Drop for Sentinel {
    fn drop(&mut self) {
        self.processes.stop();
        self.health.stop();
        self.breakers.stop_monitoring();
    }
}
