//! Process monitor with automatic restarts

use super::controller::ProcessController;
use super::types::{
    ProcessDefinition, ProcessRecord, ProcessStatus, RestartHistoryEntry, RestartReason,
};
use crate::config::ProcessMonitorConfig;
use crate::core::health::HealthChangeEvent;
use crate::utils::error::{Result, SentinelError};
use crate::utils::logging::StructuredLogger;
use chrono::Utc;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

struct ProcessEntry {
    id: String,
    controller: Arc<dyn ProcessController>,
    record: Mutex<ProcessRecord>,
}

impl ProcessEntry {
    fn snapshot(&self) -> ProcessRecord {
        self.record.lock().clone()
    }
}

/// Holds a process's `is_restarting` flag; clears it when dropped
struct RestartGuard<'a> {
    entry: &'a ProcessEntry,
}

impl<'a> RestartGuard<'a> {
    fn acquire(entry: &'a ProcessEntry) -> Option<Self> {
        let mut record = entry.record.lock();
        if record.is_restarting {
            return None;
        }
        record.is_restarting = true;
        Some(Self { entry })
    }
}

impl Drop for RestartGuard<'_> {
    fn drop(&mut self) {
        self.entry.record.lock().is_restarting = false;
    }
}

pub struct ProcessMonitor {
    config: ProcessMonitorConfig,
    processes: RwLock<Vec<Arc<ProcessEntry>>>,
    history: Mutex<VecDeque<RestartHistoryEntry>>,
    logger: Arc<StructuredLogger>,
    /// Check, resource and health-event loops
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Reactive restarts waiting out their delay
    scheduled: Mutex<Vec<JoinHandle<()>>>,
}

impl ProcessMonitor {
    pub fn new(config: ProcessMonitorConfig, logger: Arc<StructuredLogger>) -> Self {
        logger.info(
            "Process Monitor initialized",
            None,
            json!({
                "checkInterval": config.check_interval.as_millis() as u64,
                "maxRestartAttempts": config.max_restart_attempts,
                "restartCooldown": config.restart_cooldown.as_millis() as u64,
            }),
        );

        Self {
            config,
            processes: RwLock::new(Vec::new()),
            history: Mutex::new(VecDeque::new()),
            logger,
            tasks: Mutex::new(Vec::new()),
            scheduled: Mutex::new(Vec::new()),
        }
    }

    /// Monitor with every process listed in the config registered
    pub fn from_config(config: ProcessMonitorConfig, logger: Arc<StructuredLogger>) -> Self {
        let specs = config.processes.clone();
        let monitor = Self::new(config, logger);
        for spec in &specs {
            monitor.register(ProcessDefinition::from_spec(spec));
        }
        monitor
    }

    /// Register a process; a process with the same id is replaced
    pub fn register(&self, definition: ProcessDefinition) {
        let entry = Arc::new(ProcessEntry {
            id: definition.id.clone(),
            controller: definition.controller.clone(),
            record: Mutex::new(ProcessRecord::new(&definition)),
        });

        {
            let mut processes = self.processes.write();
            match processes.iter_mut().find(|e| e.id == definition.id) {
                Some(existing) => *existing = entry,
                None => processes.push(entry),
            }
        }

        self.logger.info(
            &format!("Process Monitor - Process registered: {}", definition.name),
            None,
            json!({ "processId": definition.id }),
        );
    }

    // ==================== Lifecycle ====================

    /// Spawn the check, resource and health-event loops
    pub fn start(self: &Arc<Self>, health_events: Option<broadcast::Receiver<HealthChangeEvent>>) {
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        if !tasks.is_empty() {
            self.logger
                .warn("Process Monitor already running", None, Value::Null);
            return;
        }

        self.logger.info("Process Monitor starting", None, Value::Null);

        let monitor = Arc::downgrade(self);
        let period = self.config.check_interval;
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.perform_process_check().await;
            }
        }));

        let monitor = Arc::downgrade(self);
        let period = self.config.resource_check_interval;
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.perform_resource_check().await;
            }
        }));

        if let Some(events) = health_events {
            tasks.push(tokio::spawn(Self::watch_health(Arc::downgrade(self), events)));
        }

        self.logger.success("Process Monitor started", None, Value::Null);
    }

    /// Abort every loop and any scheduled reactive restart
    pub fn stop(&self) {
        for task in self.scheduled.lock().drain(..) {
            task.abort();
        }
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }
        self.logger.info("Process Monitor stopped", None, Value::Null);
    }

    /// Reactive restarts still waiting to run
    pub fn pending_restarts(&self) -> usize {
        let mut scheduled = self.scheduled.lock();
        scheduled.retain(|t| !t.is_finished());
        scheduled.len()
    }

    pub fn is_running(&self) -> bool {
        self.tasks.lock().iter().any(|t| !t.is_finished())
    }

    async fn watch_health(monitor: Weak<Self>, mut events: broadcast::Receiver<HealthChangeEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Some(monitor) = monitor.upgrade() else {
                        break;
                    };
                    monitor.handle_health_change(&event);
                }
                Err(RecvError::Lagged(skipped)) => {
                    if let Some(monitor) = monitor.upgrade() {
                        monitor.logger.warn(
                            "Process Monitor lagged behind health events",
                            None,
                            json!({ "skipped": skipped }),
                        );
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    /// Schedule a restart when a mapped service goes from healthy to unhealthy
    ///
    /// Returns whether a restart was scheduled.
    pub fn handle_health_change(self: &Arc<Self>, event: &HealthChangeEvent) -> bool {
        if !event.is_degradation() {
            return false;
        }

        self.logger.warn(
            &format!(
                "Service {} became unhealthy, checking if process restart is needed",
                event.service_id
            ),
            None,
            Value::Null,
        );

        let Some(process_id) = self.config.service_process_map.get(&event.service_id) else {
            return false;
        };
        let Ok(entry) = self.entry(process_id) else {
            return false;
        };
        let record = entry.snapshot();
        if !record.auto_restart {
            return false;
        }

        self.logger.info(
            &format!(
                "Scheduling restart for process {} due to health issue",
                record.name
            ),
            None,
            json!({ "serviceId": event.service_id, "processId": record.id }),
        );

        let monitor = Arc::downgrade(self);
        let delay = self.config.reactive_restart_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(monitor) = monitor.upgrade() else {
                return;
            };
            let correlation_id = monitor.logger.create_context();
            if monitor.should_restart(&entry.snapshot()) {
                monitor
                    .restart_process(&entry, RestartReason::HealthDegraded, &correlation_id)
                    .await;
            }
            monitor.logger.release_context(&correlation_id);
        });

        let mut scheduled = self.scheduled.lock();
        scheduled.retain(|t| !t.is_finished());
        scheduled.push(task);
        true
    }

    // ==================== Checks ====================

    pub async fn perform_process_check(&self) {
        let correlation_id = self.logger.create_context();
        self.logger.debug(
            "Starting process check cycle",
            Some(&correlation_id),
            Value::Null,
        );

        let entries: Vec<Arc<ProcessEntry>> = self.processes.read().clone();
        join_all(
            entries
                .iter()
                .map(|entry| self.check_process(entry, &correlation_id)),
        )
        .await;

        self.logger.debug(
            "Process check cycle completed",
            Some(&correlation_id),
            Value::Null,
        );
        self.logger.release_context(&correlation_id);
    }

    async fn check_process(&self, entry: &ProcessEntry, correlation_id: &str) {
        let cid = Some(correlation_id);
        let name = {
            let record = entry.record.lock();
            if record.is_restarting {
                self.logger.debug(
                    &format!("Process {} is currently restarting, skipping check", record.name),
                    cid,
                    Value::Null,
                );
                return;
            }
            record.name.clone()
        };

        let result = entry.controller.is_running().await;

        let record = {
            let mut record = entry.record.lock();
            if record.is_restarting {
                return;
            }
            record.last_check = Some(Utc::now());
            match &result {
                Ok(true) => {
                    record.status = ProcessStatus::Running;
                    record.consecutive_failures = 0;
                }
                Ok(false) => {
                    record.status = ProcessStatus::Stopped;
                    record.consecutive_failures += 1;
                }
                Err(_) => {
                    record.status = ProcessStatus::Error;
                    record.consecutive_failures += 1;
                }
            }
            record.clone()
        };

        match result {
            Ok(true) => {
                self.logger
                    .debug(&format!("Process {} is running", name), cid, Value::Null);
                return;
            }
            Ok(false) => {
                self.logger.warn(
                    &format!(
                        "Process {} is not running (failure {})",
                        name, record.consecutive_failures
                    ),
                    cid,
                    Value::Null,
                );
            }
            Err(error) => {
                self.logger.error(
                    &format!("Error checking process {}", name),
                    cid,
                    json!({
                        "error": error.to_string(),
                        "consecutiveFailures": record.consecutive_failures,
                    }),
                );
            }
        }

        if record.auto_restart && self.should_restart(&record) {
            self.restart_process(entry, RestartReason::AutomaticRestart, correlation_id)
                .await;
        }
    }

    /// Critical, under the attempt cap and out of cooldown
    pub fn should_restart(&self, record: &ProcessRecord) -> bool {
        if record.restart_count >= self.config.max_restart_attempts {
            self.logger.warn(
                &format!(
                    "Process {} has exceeded max restart attempts ({})",
                    record.name, self.config.max_restart_attempts
                ),
                None,
                Value::Null,
            );
            return false;
        }

        if let Some(last_restart) = record.last_restart {
            let since = (Utc::now() - last_restart).to_std().unwrap_or_default();
            if since < self.config.restart_cooldown {
                self.logger.debug(
                    &format!("Process {} is in restart cooldown", record.name),
                    None,
                    Value::Null,
                );
                return false;
            }
        }

        if !record.critical {
            self.logger.debug(
                &format!("Process {} is not critical, skipping auto-restart", record.name),
                None,
                Value::Null,
            );
            return false;
        }

        true
    }

    // ==================== Restart ====================

    /// Run the restart procedure; `None` when a restart is already in flight
    async fn restart_process(
        &self,
        entry: &ProcessEntry,
        reason: RestartReason,
        correlation_id: &str,
    ) -> Option<RestartHistoryEntry> {
        let cid = Some(correlation_id);
        let Some(_guard) = RestartGuard::acquire(entry) else {
            let name = entry.record.lock().name.clone();
            self.logger.warn(
                &format!("Process {} is already being restarted", name),
                cid,
                Value::Null,
            );
            return None;
        };

        let (name, attempt) = {
            let mut record = entry.record.lock();
            record.last_restart = Some(Utc::now());
            record.restart_count += 1;
            (record.name.clone(), record.restart_count)
        };

        self.logger.warn(
            &format!("Attempting to restart process {} (attempt {})", name, attempt),
            cid,
            json!({ "reason": reason.as_str() }),
        );

        let outcome = self.run_restart(entry, &name, correlation_id).await;

        let error = match outcome {
            Ok(()) => {
                {
                    let mut record = entry.record.lock();
                    record.status = ProcessStatus::Running;
                    record.consecutive_failures = 0;
                    record.start_time = Some(Utc::now());
                }
                self.logger.success(
                    &format!("Process {} restarted successfully", name),
                    cid,
                    json!({ "attempt": attempt }),
                );
                None
            }
            Err(error) => {
                entry.record.lock().status = ProcessStatus::Failed;
                self.logger.error(
                    &format!("Failed to restart process {}", name),
                    cid,
                    json!({ "error": error.to_string(), "attempt": attempt }),
                );
                Some(error.to_string())
            }
        };

        let history_entry = RestartHistoryEntry {
            process_id: entry.id.clone(),
            process_name: name,
            timestamp: Utc::now(),
            attempt,
            success: error.is_none(),
            reason,
            error,
        };
        self.push_history(history_entry.clone());
        Some(history_entry)
    }

    async fn run_restart(&self, entry: &ProcessEntry, name: &str, correlation_id: &str) -> Result<()> {
        let cid = Some(correlation_id);

        if !self.check_dependencies(entry, name, correlation_id).await {
            return Err(SentinelError::command("Dependencies not ready for restart"));
        }

        let controller = &entry.controller;
        if controller.supports_stop() {
            self.logger
                .debug(&format!("Stopping process {}", name), cid, Value::Null);
            controller.stop().await?;
            tokio::time::sleep(self.config.stop_grace).await;
        }

        if !controller.supports_start() {
            return Err(SentinelError::unsupported("No start command defined for process"));
        }

        self.logger
            .debug(&format!("Starting process {}", name), cid, Value::Null);
        controller.start().await?;
        tokio::time::sleep(self.config.startup_grace).await;

        if controller.is_running().await? {
            Ok(())
        } else {
            Err(SentinelError::command(
                "Process failed to start after restart command",
            ))
        }
    }

    async fn check_dependencies(&self, entry: &ProcessEntry, name: &str, correlation_id: &str) -> bool {
        let cid = Some(correlation_id);
        let dependencies = entry.record.lock().dependencies.clone();
        if dependencies.is_empty() {
            return true;
        }

        self.logger.debug(
            &format!("Checking dependencies for {}", name),
            cid,
            json!({ "dependencies": dependencies }),
        );

        for dependency_id in &dependencies {
            let Ok(dependency) = self.entry(dependency_id) else {
                self.logger.warn(
                    &format!("Dependency {} not found for {}", dependency_id, name),
                    cid,
                    Value::Null,
                );
                continue;
            };

            if !matches!(dependency.controller.is_running().await, Ok(true)) {
                let dependency_name = dependency.record.lock().name.clone();
                self.logger.warn(
                    &format!("Dependency {} is not running for {}", dependency_name, name),
                    cid,
                    Value::Null,
                );
                return false;
            }
        }

        true
    }

    fn push_history(&self, entry: RestartHistoryEntry) {
        let mut history = self.history.lock();
        history.push_back(entry);
        while history.len() > self.config.max_restart_history {
            history.pop_front();
        }
    }

    // ==================== Resources ====================

    /// Sample resource usage of every running process
    pub async fn perform_resource_check(&self) {
        let correlation_id = self.logger.create_context();
        let cid = Some(correlation_id.as_str());
        self.logger
            .debug("Starting resource check cycle", cid, Value::Null);

        let running: Vec<Arc<ProcessEntry>> = self
            .processes
            .read()
            .iter()
            .filter(|e| e.record.lock().status == ProcessStatus::Running)
            .cloned()
            .collect();

        for entry in running {
            let name = entry.record.lock().name.clone();
            match entry.controller.resource_usage().await {
                Ok(usage) => {
                    entry.record.lock().resource_usage = usage;
                    if usage.cpu_percent > self.config.cpu_warn_percent
                        || usage.memory_mb > self.config.memory_warn_mb
                    {
                        self.logger.warn(
                            &format!("Process {} high resource usage", name),
                            cid,
                            json!({ "cpu": usage.cpu_percent, "memory": usage.memory_mb }),
                        );
                    }
                }
                Err(error) => {
                    self.logger.debug(
                        &format!("Could not get resource info for {}", name),
                        cid,
                        json!({ "error": error.to_string() }),
                    );
                }
            }
        }

        self.logger.release_context(&correlation_id);
    }

    // ==================== Manual operations ====================

    /// Start a stopped process; no-op when it is already running
    pub async fn start_process(&self, process_id: &str) -> Result<Option<RestartHistoryEntry>> {
        let entry = self.entry(process_id)?;
        let correlation_id = self.logger.create_context();

        let record = entry.snapshot();
        let result = if record.status == ProcessStatus::Running {
            self.logger.warn(
                &format!("Process {} is already running", record.name),
                Some(&correlation_id),
                Value::Null,
            );
            None
        } else {
            self.restart_process(&entry, RestartReason::Manual, &correlation_id)
                .await
        };

        self.logger.release_context(&correlation_id);
        Ok(result)
    }

    pub async fn stop_process(&self, process_id: &str) -> Result<ProcessRecord> {
        let entry = self.entry(process_id)?;
        let name = entry.record.lock().name.clone();

        if !entry.controller.supports_stop() {
            return Err(SentinelError::unsupported(format!(
                "No stop command defined for process {}",
                name
            )));
        }

        let correlation_id = self.logger.create_context();
        let result = entry.controller.stop().await;
        match &result {
            Ok(()) => {
                entry.record.lock().status = ProcessStatus::Stopped;
                self.logger.info(
                    &format!("Process {} stopped manually", name),
                    Some(&correlation_id),
                    Value::Null,
                );
            }
            Err(error) => {
                self.logger.error(
                    &format!("Failed to stop process {}", name),
                    Some(&correlation_id),
                    json!({ "error": error.to_string() }),
                );
            }
        }
        self.logger.release_context(&correlation_id);

        result.map(|()| entry.snapshot())
    }

    pub fn reset_restart_count(&self, process_id: &str) -> Result<ProcessRecord> {
        let entry = self.entry(process_id)?;
        let record = {
            let mut record = entry.record.lock();
            record.restart_count = 0;
            record.consecutive_failures = 0;
            record.clone()
        };
        self.logger.info(
            &format!("Reset restart count for process {}", record.name),
            None,
            Value::Null,
        );
        Ok(record)
    }

    // ==================== Accessors ====================

    fn entry(&self, process_id: &str) -> Result<Arc<ProcessEntry>> {
        self.processes
            .read()
            .iter()
            .find(|e| e.id == process_id)
            .cloned()
            .ok_or_else(|| SentinelError::not_found(format!("Process not found: {}", process_id)))
    }

    pub fn process(&self, process_id: &str) -> Result<ProcessRecord> {
        self.entry(process_id).map(|e| e.snapshot())
    }

    pub fn processes(&self) -> Vec<ProcessRecord> {
        self.processes.read().iter().map(|e| e.snapshot()).collect()
    }

    /// The most recent `limit` restarts, newest first
    pub fn restart_history(&self, limit: usize) -> Vec<RestartHistoryEntry> {
        self.history.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn config(&self) -> &ProcessMonitorConfig {
        &self.config
    }
}

impl Drop for ProcessMonitor {
    fn drop(&mut self) {
        for task in self
            .tasks
            .get_mut()
            .drain(..)
            .chain(self.scheduled.get_mut().drain(..))
        {
            task.abort();
        }
    }
}
