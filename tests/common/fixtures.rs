//! Test fixtures
//!
//! Every fixture writes into its own temporary directory and disables the
//! checks that need tools absent from CI (PowerShell, a UI dev server,
//! Docker).

use collector_sentinel::Config;
use collector_sentinel::config::{BreakerRoute, CircuitBreakerConfig};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// A config rooted in a fresh temporary data directory
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
}

impl TestEnv {
    /// Only the file system check is enabled, against a complete data dir
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        for sub in ["results", "reports", "logs", "cache"] {
            std::fs::create_dir_all(dir.path().join(sub)).expect("create data subdir");
        }

        let mut config = Config::default();
        config.logging.log_dir = None;

        config.http_client.max_retries = 0;
        config.http_client.base_delay = Duration::from_millis(10);

        config.health.check_interval = Duration::from_secs(3600);
        config.health.searxng.enabled = false;
        config.health.powershell.enabled = false;
        config.health.dev_server.enabled = false;
        config.health.filesystem.data_dir = dir.path().to_path_buf();

        config.process.processes.clear();
        config.process.service_process_map.clear();
        config.process.check_interval = Duration::from_secs(3600);
        config.process.resource_check_interval = Duration::from_secs(3600);
        config.process.stop_grace = Duration::ZERO;
        config.process.startup_grace = Duration::ZERO;
        config.process.restart_cooldown = Duration::ZERO;

        config.scraper.work_dir = dir.path().to_path_buf();

        Self { dir, config }
    }

    /// Enable the SearxNG check against `url`, guarded by the `searxng` breaker
    pub fn with_search_backend(mut self, url: &str) -> Self {
        self.config.health.searxng.enabled = true;
        self.config.health.searxng.url = url.to_string();
        self.config.health.searxng.timeout = Duration::from_millis(500);

        let searxng = CircuitBreakerConfig {
            failure_threshold: 2,
            routes: vec![BreakerRoute {
                host_contains: Some("127.0.0.1".to_string()),
                port: None,
            }],
            ..CircuitBreakerConfig::searxng()
        };
        self.config.circuit_breakers = vec![searxng, CircuitBreakerConfig::powershell()];
        self
    }

    /// Enable the non-critical UI check against `url`
    pub fn with_dev_server(mut self, url: &str) -> Self {
        self.config.health.dev_server.enabled = true;
        self.config.health.dev_server.url = url.to_string();
        self.config.health.dev_server.timeout = Duration::from_millis(500);
        self
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
