//! Health monitor configuration

use super::{default_data_dir, default_searx_url, default_ui_url, duration_ms};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    #[serde(with = "duration_ms")]
    pub check_interval: Duration,
    /// Snapshots kept in memory
    pub max_history_entries: usize,
    /// Capacity of the status-change broadcast channel
    pub event_capacity: usize,
    pub searxng: SearchBackendSettings,
    pub powershell: CommandRuntimeSettings,
    pub filesystem: FilesystemSettings,
    pub dev_server: DevServerSettings,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            max_history_entries: 100,
            event_capacity: 64,
            searxng: SearchBackendSettings::default(),
            powershell: CommandRuntimeSettings::default(),
            filesystem: FilesystemSettings::default(),
            dev_server: DevServerSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBackendSettings {
    pub enabled: bool,
    pub critical: bool,
    pub url: String,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for SearchBackendSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            critical: true,
            url: default_searx_url(),
            timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandRuntimeSettings {
    pub enabled: bool,
    pub critical: bool,
    pub program: String,
    pub args: Vec<String>,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for CommandRuntimeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            critical: true,
            program: "powershell.exe".to_string(),
            args: vec![
                "-Command".to_string(),
                "Get-Host | Select-Object Version | ConvertTo-Json".to_string(),
            ],
            timeout: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemSettings {
    pub enabled: bool,
    pub critical: bool,
    pub data_dir: PathBuf,
    /// Subdirectories reported as issues when absent
    pub required_dirs: Vec<String>,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for FilesystemSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            critical: true,
            data_dir: default_data_dir(),
            required_dirs: ["results", "reports", "logs", "cache"]
                .into_iter()
                .map(String::from)
                .collect(),
            timeout: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevServerSettings {
    pub enabled: bool,
    pub critical: bool,
    pub url: String,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for DevServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            critical: false,
            url: default_ui_url(),
            timeout: Duration::from_millis(3000),
        }
    }
}
