//! Process records and restart history

use super::controller::{ProcessController, controller_from_spec};
use crate::config::ProcessSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    #[default]
    Unknown,
    Running,
    Stopped,
    /// The running check itself failed
    Error,
    /// The last restart attempt failed
    Failed,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Unknown => "unknown",
            ProcessStatus::Running => "running",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Error => "error",
            ProcessStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// Why a restart was attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    AutomaticRestart,
    HealthDegraded,
    Manual,
}

impl RestartReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartReason::AutomaticRestart => "automatic_restart",
            RestartReason::HealthDegraded => "health_degraded",
            RestartReason::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartHistoryEntry {
    pub process_id: String,
    pub process_name: String,
    pub timestamp: DateTime<Utc>,
    /// Restart count at the time of the attempt
    pub attempt: u32,
    pub success: bool,
    pub reason: RestartReason,
    pub error: Option<String>,
}

/// A process to register with the monitor
#[derive(Clone)]
pub struct ProcessDefinition {
    pub id: String,
    pub name: String,
    pub critical: bool,
    pub auto_restart: bool,
    /// Process ids that must be running before this one is restarted
    pub dependencies: Vec<String>,
    pub controller: Arc<dyn ProcessController>,
}

impl ProcessDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        controller: Arc<dyn ProcessController>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            critical: false,
            auto_restart: false,
            dependencies: Vec::new(),
            controller,
        }
    }

    pub fn from_spec(spec: &ProcessSpec) -> Self {
        Self {
            id: spec.id.clone(),
            name: spec.name.clone(),
            critical: spec.critical,
            auto_restart: spec.auto_restart,
            dependencies: spec.dependencies.clone(),
            controller: controller_from_spec(&spec.controller),
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn auto_restart(mut self, auto_restart: bool) -> Self {
        self.auto_restart = auto_restart;
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }
}

impl fmt::Debug for ProcessDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessDefinition")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("critical", &self.critical)
            .field("auto_restart", &self.auto_restart)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// Monitor bookkeeping for one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub id: String,
    pub name: String,
    pub critical: bool,
    pub auto_restart: bool,
    pub dependencies: Vec<String>,
    pub status: ProcessStatus,
    pub is_restarting: bool,
    pub restart_count: u32,
    pub consecutive_failures: u32,
    pub last_check: Option<DateTime<Utc>>,
    pub last_restart: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub resource_usage: ResourceUsage,
}

impl ProcessRecord {
    pub fn new(definition: &ProcessDefinition) -> Self {
        Self {
            id: definition.id.clone(),
            name: definition.name.clone(),
            critical: definition.critical,
            auto_restart: definition.auto_restart,
            dependencies: definition.dependencies.clone(),
            status: ProcessStatus::Unknown,
            is_restarting: false,
            restart_count: 0,
            consecutive_failures: 0,
            last_check: None,
            last_restart: None,
            start_time: None,
            resource_usage: ResourceUsage::default(),
        }
    }

    /// Milliseconds since the last successful (re)start
    pub fn uptime_ms(&self) -> i64 {
        self.start_time
            .map(|t| (Utc::now() - t).num_milliseconds())
            .unwrap_or(0)
    }
}
