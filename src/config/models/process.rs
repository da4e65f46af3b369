//! Process monitor configuration

use super::duration_ms;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessMonitorConfig {
    #[serde(with = "duration_ms")]
    pub check_interval: Duration,
    #[serde(with = "duration_ms")]
    pub resource_check_interval: Duration,
    pub max_restart_attempts: u32,
    /// Minimum time between two restarts of one process
    #[serde(with = "duration_ms")]
    pub restart_cooldown: Duration,
    /// Wait after stopping before starting again
    #[serde(with = "duration_ms")]
    pub stop_grace: Duration,
    /// Wait after starting before verifying
    #[serde(with = "duration_ms")]
    pub startup_grace: Duration,
    /// Delay between a health degradation and the restart it triggers
    #[serde(with = "duration_ms")]
    pub reactive_restart_delay: Duration,
    pub max_restart_history: usize,
    pub cpu_warn_percent: f64,
    pub memory_warn_mb: f64,
    /// Health service id to process id
    pub service_process_map: HashMap<String, String>,
    pub processes: Vec<ProcessSpec>,
}

impl Default for ProcessMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(15),
            resource_check_interval: Duration::from_secs(300),
            max_restart_attempts: 3,
            restart_cooldown: Duration::from_secs(60),
            stop_grace: Duration::from_secs(2),
            startup_grace: Duration::from_secs(5),
            reactive_restart_delay: Duration::from_secs(5),
            max_restart_history: 100,
            cpu_warn_percent: 80.0,
            memory_warn_mb: 1000.0,
            service_process_map: HashMap::from([("searxng".to_string(), "searxng".to_string())]),
            processes: vec![ProcessSpec::searxng_container()],
        }
    }
}

/// A process the monitor watches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub critical: bool,
    #[serde(default)]
    pub auto_restart: bool,
    /// Process ids that must be running before this one is restarted
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub controller: ControllerSpec,
}

impl ProcessSpec {
    pub fn searxng_container() -> Self {
        Self {
            id: "searxng".to_string(),
            name: "SearxNG Docker Container".to_string(),
            critical: true,
            auto_restart: true,
            dependencies: Vec::new(),
            controller: ControllerSpec::Docker {
                container: "searxng".to_string(),
            },
        }
    }
}

/// How a process is checked and controlled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerSpec {
    Docker {
        container: String,
    },
    Command {
        check: CommandSpec,
        #[serde(default)]
        start: Option<CommandSpec>,
        #[serde(default)]
        stop: Option<CommandSpec>,
        #[serde(default)]
        stats: Option<CommandSpec>,
        /// Running only when the check output contains this
        #[serde(default)]
        expect_output: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(with = "duration_ms", default = "default_command_timeout")]
    pub timeout: Duration,
}

pub fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}
