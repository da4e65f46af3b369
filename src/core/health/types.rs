//! Health status types and check results
//!
//! This module defines the service records kept by the monitor, the
//! snapshots appended to its history and the events it broadcasts.

use super::checker::ServiceCheck;
use crate::utils::error::CircuitBreakerStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Weight given to history when folding a new check into the uptime
pub const UPTIME_WEIGHT: f64 = 0.99;

/// Weight given to history when folding a new sample into the response time
pub const RESPONSE_TIME_WEIGHT: f64 = 0.7;

/// Status of a single service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Not checked yet
    #[default]
    Unknown,
    /// Last check succeeded
    Healthy,
    /// Last check failed or timed out
    Unhealthy,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "unknown",
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status over all registered services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    /// No check cycle has completed yet
    #[default]
    Unknown,
    Healthy,
    /// Only non-critical services are failing
    Degraded,
    /// At least one critical service is failing
    Critical,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Unknown => "unknown",
            OverallStatus::Healthy => "healthy",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a successful check reports back
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub metadata: Value,
    /// Non-fatal findings; the service still counts as healthy
    pub issues: Vec<String>,
}

impl CheckOutcome {
    pub fn new(metadata: Value) -> Self {
        Self {
            metadata,
            issues: Vec::new(),
        }
    }

    pub fn with_issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }
}

/// A service to register with the monitor
#[derive(Clone)]
pub struct ServiceDefinition {
    pub id: String,
    pub name: String,
    pub critical: bool,
    pub timeout: Duration,
    pub check: Arc<dyn ServiceCheck>,
}

impl ServiceDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        check: Arc<dyn ServiceCheck>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            critical: false,
            timeout: Duration::from_secs(5),
            check,
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("critical", &self.critical)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Health bookkeeping for one registered service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub critical: bool,
    pub timeout_ms: u64,
    pub status: ServiceStatus,
    pub last_check: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub success_count: u64,
    pub failure_count: u64,
    pub total_checks: u64,
    pub average_response_time_ms: f64,
    /// Exponentially weighted share of successful checks, in percent
    pub uptime: f64,
    pub issues: Vec<String>,
    pub metadata: Value,
}

impl ServiceRecord {
    pub fn new(definition: &ServiceDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            critical: definition.critical,
            timeout_ms: definition.timeout.as_millis() as u64,
            status: ServiceStatus::Unknown,
            last_check: None,
            last_success: None,
            last_failure: None,
            success_count: 0,
            failure_count: 0,
            total_checks: 0,
            average_response_time_ms: 0.0,
            uptime: 100.0,
            issues: Vec::new(),
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }

    /// Fold a successful check into the record
    pub fn record_success(&mut self, outcome: CheckOutcome, response_time_ms: f64) {
        let now = Utc::now();
        self.total_checks += 1;
        self.last_check = Some(now);
        self.status = ServiceStatus::Healthy;
        self.last_success = Some(now);
        self.success_count += 1;
        self.metadata = outcome.metadata;
        self.issues = outcome.issues;
        self.update_response_time(response_time_ms);
        self.update_uptime(true);
    }

    /// Fold a failed check into the record
    pub fn record_failure(&mut self, error: String, response_time_ms: f64) {
        let now = Utc::now();
        self.total_checks += 1;
        self.last_check = Some(now);
        self.status = ServiceStatus::Unhealthy;
        self.last_failure = Some(now);
        self.failure_count += 1;
        self.issues = vec![error];
        self.update_response_time(response_time_ms);
        self.update_uptime(false);
    }

    fn update_response_time(&mut self, response_time_ms: f64) {
        self.average_response_time_ms = if self.average_response_time_ms == 0.0 {
            response_time_ms
        } else {
            self.average_response_time_ms * RESPONSE_TIME_WEIGHT
                + response_time_ms * (1.0 - RESPONSE_TIME_WEIGHT)
        };
    }

    fn update_uptime(&mut self, success: bool) {
        self.uptime = if success {
            self.uptime * UPTIME_WEIGHT + 100.0 * (1.0 - UPTIME_WEIGHT)
        } else {
            self.uptime * UPTIME_WEIGHT
        };
    }
}

/// Service fields copied into a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    pub critical: bool,
    pub status: ServiceStatus,
    pub uptime: f64,
    pub average_response_time_ms: f64,
    pub issues: Vec<String>,
}

impl From<&ServiceRecord> for ServiceSummary {
    fn from(record: &ServiceRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            critical: record.critical,
            status: record.status,
            uptime: record.uptime,
            average_response_time_ms: record.average_response_time_ms,
            issues: record.issues.clone(),
        }
    }
}

/// Point-in-time view of the whole system
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overall_status: OverallStatus,
    pub overall_message: String,
    pub services: Vec<ServiceSummary>,
    pub circuit_breakers: Vec<CircuitBreakerStatus>,
}

impl HealthSnapshot {
    /// Snapshot reported before the first cycle completes
    pub fn unknown(services: Vec<ServiceSummary>, circuit_breakers: Vec<CircuitBreakerStatus>) -> Self {
        Self {
            timestamp: Utc::now(),
            overall_status: OverallStatus::Unknown,
            overall_message: "No health checks performed yet".to_string(),
            services,
            circuit_breakers,
        }
    }

    pub fn healthy_services(&self) -> usize {
        self.services
            .iter()
            .filter(|s| s.status == ServiceStatus::Healthy)
            .count()
    }
}

/// Aggregate the overall status from service records
///
/// Critical services that are not healthy win over degraded non-critical ones.
pub fn aggregate<'a, I>(records: I) -> (OverallStatus, String)
where
    I: IntoIterator<Item = &'a ServiceRecord>,
{
    let mut critical_down = Vec::new();
    let mut degraded = Vec::new();
    for record in records {
        if record.is_healthy() {
            continue;
        }
        if record.critical {
            critical_down.push(record.name.as_str());
        } else {
            degraded.push(record.name.as_str());
        }
    }

    if !critical_down.is_empty() {
        (
            OverallStatus::Critical,
            format!("Critical services down: {}", critical_down.join(", ")),
        )
    } else if !degraded.is_empty() {
        (
            OverallStatus::Degraded,
            format!("Non-critical services degraded: {}", degraded.join(", ")),
        )
    } else {
        (OverallStatus::Healthy, "All systems operational".to_string())
    }
}

/// Broadcast when a service changes status
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChangeEvent {
    pub service_id: String,
    pub previous: ServiceStatus,
    pub current: ServiceStatus,
    pub record: ServiceRecord,
}

impl HealthChangeEvent {
    /// A healthy service just started failing
    pub fn is_degradation(&self) -> bool {
        self.previous == ServiceStatus::Healthy && self.current == ServiceStatus::Unhealthy
    }
}
