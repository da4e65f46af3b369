//! Health monitor implementation
//!
//! Polls every registered service on a fixed interval, keeps a bounded
//! history of system snapshots and broadcasts status changes.

use super::checker::ServiceCheck;
use super::types::{
    HealthChangeEvent, HealthSnapshot, ServiceDefinition, ServiceRecord, ServiceSummary, aggregate,
};
use crate::config::{HealthConfig, Validate};
use crate::utils::error::{CircuitBreakerRegistry, CircuitBreakerStatus, Result, SentinelError};
use crate::utils::logging::StructuredLogger;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const TIMEOUT_MESSAGE: &str = "Health check timeout";

struct EntryState {
    record: ServiceRecord,
    /// Ticket of the newest result folded into `record`
    applied: u64,
}

struct ServiceEntry {
    id: String,
    check: Arc<dyn ServiceCheck>,
    timeout: Duration,
    tickets: AtomicU64,
    state: Mutex<EntryState>,
}

impl ServiceEntry {
    fn record(&self) -> ServiceRecord {
        self.state.lock().record.clone()
    }
}

/// Health monitor for the services the collector depends on
pub struct HealthMonitor {
    config: HealthConfig,
    services: RwLock<Vec<Arc<ServiceEntry>>>,
    history: Mutex<VecDeque<HealthSnapshot>>,
    events: broadcast::Sender<HealthChangeEvent>,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
    logger: Arc<StructuredLogger>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    /// Fails with [`SentinelError::Config`] when `config` does not validate,
    /// e.g. on a zero `check_interval`.
    pub fn new(
        config: HealthConfig,
        breakers: Option<Arc<CircuitBreakerRegistry>>,
        logger: Arc<StructuredLogger>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SentinelError::Config(format!("Health config error: {}", e)))?;

        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        logger.info(
            "Health Monitor initialized",
            None,
            json!({ "checkInterval": config.check_interval.as_millis() as u64 }),
        );

        Ok(Self {
            config,
            services: RwLock::new(Vec::new()),
            history: Mutex::new(VecDeque::new()),
            events,
            breakers,
            logger,
            task: Mutex::new(None),
        })
    }

    /// Register a service; a service with the same id is replaced
    pub fn register(&self, definition: ServiceDefinition) {
        let entry = Arc::new(ServiceEntry {
            id: definition.id.clone(),
            check: definition.check.clone(),
            timeout: definition.timeout,
            tickets: AtomicU64::new(0),
            state: Mutex::new(EntryState {
                record: ServiceRecord::new(&definition),
                applied: 0,
            }),
        });

        {
            let mut services = self.services.write();
            match services.iter_mut().find(|e| e.id == definition.id) {
                Some(existing) => *existing = entry,
                None => services.push(entry),
            }
        }

        self.logger.info(
            &format!("Health Monitor - Service registered: {}", definition.name),
            None,
            json!({ "serviceId": definition.id }),
        );
    }

    /// Spawn the polling loop; the first cycle runs immediately
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            self.logger
                .warn("Health Monitor already running", None, Value::Null);
            return;
        }

        self.logger.info("Health Monitor starting", None, Value::Null);

        let monitor = Arc::downgrade(self);
        let period = self.config.check_interval;
        *task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.perform_health_check().await;
            }
        }));

        self.logger.success("Health Monitor started", None, Value::Null);
    }

    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            self.logger.info("Health Monitor stopped", None, Value::Null);
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Run one full cycle and return the resulting snapshot
    pub async fn perform_health_check(&self) -> HealthSnapshot {
        let correlation_id = self.logger.create_context();
        let cid = Some(correlation_id.as_str());
        self.logger
            .health("Starting health check cycle", cid, Value::Null);

        let entries: Vec<Arc<ServiceEntry>> = self.services.read().clone();
        join_all(
            entries
                .iter()
                .map(|entry| self.check_entry(entry, &correlation_id)),
        )
        .await;

        let snapshot = self.update_overall_health(&correlation_id);

        self.logger
            .health("Health check cycle completed", cid, Value::Null);
        self.logger.release_context(&correlation_id);
        snapshot
    }

    /// Check one service out of band
    pub async fn force_check(&self, service_id: &str) -> Result<ServiceRecord> {
        let entry = self.entry(service_id)?;
        let correlation_id = self.logger.create_context();
        let record = self.check_entry(&entry, &correlation_id).await;
        self.logger.release_context(&correlation_id);
        Ok(record)
    }

    async fn check_entry(&self, entry: &ServiceEntry, correlation_id: &str) -> ServiceRecord {
        let ticket = entry.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        let cid = Some(correlation_id);

        let name = entry.state.lock().record.name.clone();
        self.logger
            .debug(&format!("Checking service: {}", name), cid, Value::Null);

        let started = Instant::now();
        let result = tokio::time::timeout(entry.timeout, entry.check.check(correlation_id)).await;
        let response_time = started.elapsed().as_secs_f64() * 1000.0;

        let (previous, record) = {
            let mut state = entry.state.lock();
            if ticket <= state.applied {
                drop(state);
                self.logger.debug(
                    &format!("Discarding stale result for {}", name),
                    cid,
                    json!({ "ticket": ticket }),
                );
                return entry.record();
            }
            state.applied = ticket;

            let previous = state.record.status;
            match result {
                Ok(Ok(outcome)) => state.record.record_success(outcome, response_time),
                Ok(Err(error)) => state.record.record_failure(error.to_string(), response_time),
                Err(_) => state
                    .record
                    .record_failure(TIMEOUT_MESSAGE.to_string(), response_time),
            }
            (previous, state.record.clone())
        };

        if record.is_healthy() {
            self.logger.health(
                &format!("Service {} is healthy", record.name),
                cid,
                json!({
                    "responseTime": response_time,
                    "metadata": record.metadata,
                }),
            );
        } else {
            self.logger.error(
                &format!("Service {} is unhealthy", record.name),
                cid,
                json!({
                    "error": record.issues.first(),
                    "responseTime": response_time,
                    "failureCount": record.failure_count,
                }),
            );
        }

        if previous != record.status {
            self.logger.connection_health(
                &record.name,
                record.status.as_str(),
                json!({ "previous": previous, "serviceId": record.id }),
                cid,
            );
            // No subscribers is fine
            let _ = self.events.send(HealthChangeEvent {
                service_id: record.id.clone(),
                previous,
                current: record.status,
                record: record.clone(),
            });
        }

        record
    }

    fn update_overall_health(&self, correlation_id: &str) -> HealthSnapshot {
        let records = self.services();
        let (overall_status, overall_message) = aggregate(&records);

        let snapshot = HealthSnapshot {
            timestamp: chrono::Utc::now(),
            overall_status,
            overall_message,
            services: records.iter().map(ServiceSummary::from).collect(),
            circuit_breakers: self.circuit_breaker_statuses(),
        };

        {
            let mut history = self.history.lock();
            history.push_back(snapshot.clone());
            while history.len() > self.config.max_history_entries {
                history.pop_front();
            }
        }

        let critical_healthy = records.iter().filter(|r| r.critical).all(|r| r.is_healthy());
        self.logger.health(
            &format!("Overall system status: {}", snapshot.overall_status),
            Some(correlation_id),
            json!({
                "overallStatus": snapshot.overall_status,
                "overallMessage": snapshot.overall_message,
                "criticalServicesHealthy": critical_healthy,
                "totalServices": records.len(),
                "healthyServices": snapshot.healthy_services(),
            }),
        );

        snapshot
    }

    fn entry(&self, service_id: &str) -> Result<Arc<ServiceEntry>> {
        self.services
            .read()
            .iter()
            .find(|e| e.id == service_id)
            .cloned()
            .ok_or_else(|| SentinelError::not_found(format!("Service not found: {}", service_id)))
    }

    // ==================== Accessors ====================

    /// Latest snapshot, or an `unknown` summary before the first cycle
    pub fn overall_health(&self) -> HealthSnapshot {
        if let Some(latest) = self.history.lock().back() {
            return latest.clone();
        }
        let services = self.services();
        HealthSnapshot::unknown(
            services.iter().map(ServiceSummary::from).collect(),
            self.circuit_breaker_statuses(),
        )
    }

    pub fn service(&self, service_id: &str) -> Result<ServiceRecord> {
        self.entry(service_id).map(|e| e.record())
    }

    pub fn services(&self) -> Vec<ServiceRecord> {
        self.services.read().iter().map(|e| e.record()).collect()
    }

    /// The most recent `limit` snapshots, oldest first
    pub fn history(&self, limit: usize) -> Vec<HealthSnapshot> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub fn circuit_breaker_statuses(&self) -> Vec<CircuitBreakerStatus> {
        self.breakers
            .as_ref()
            .map(|registry| registry.statuses())
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthChangeEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}
