//! Built-in service checks

use super::checker::ServiceCheck;
use super::types::{CheckOutcome, ServiceDefinition};
use crate::config::{CommandRuntimeSettings, DevServerSettings, FilesystemSettings, SearchBackendSettings};
use crate::core::process::ShellCommand;
use crate::utils::error::{Result, SentinelError};
use crate::utils::net::{HttpResponse, RequestOptions, RetryingHttpClient};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Unwrap a check response, mapping failing statuses onto `describe(status)`
fn expect_status(
    result: Result<HttpResponse>,
    accept: impl Fn(u16) -> bool,
    describe: impl Fn(u16) -> String,
) -> Result<HttpResponse> {
    match result {
        Ok(response) if accept(response.status_code) => Ok(response),
        Ok(response) => Err(SentinelError::check_failed(describe(response.status_code))),
        Err(SentinelError::HttpStatus { status, .. }) => {
            Err(SentinelError::check_failed(describe(status)))
        }
        Err(e) => Err(e),
    }
}

/// Runs a test query against the SearxNG JSON API
pub struct SearchBackendCheck {
    client: Arc<RetryingHttpClient>,
    base_url: String,
    timeout: Duration,
}

impl SearchBackendCheck {
    pub fn new(client: Arc<RetryingHttpClient>, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_settings(client: Arc<RetryingHttpClient>, settings: &SearchBackendSettings) -> Self {
        Self::new(client, settings.url.clone(), settings.timeout)
    }

    pub fn search_url(&self) -> String {
        format!(
            "{}/search?q=health-check&format=json",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ServiceCheck for SearchBackendCheck {
    async fn check(&self, correlation_id: &str) -> Result<CheckOutcome> {
        let options = RequestOptions::get(self.search_url())
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .max_retries(0);

        let response = expect_status(
            self.client.make_request(options, Some(correlation_id)).await,
            |status| (200..400).contains(&status),
            |status| format!("SearxNG returned status {}", status),
        )?;

        let metadata = match response.data.as_json() {
            Some(body) => json!({
                "status_code": response.status_code,
                "has_results": body["results"].as_array().is_some_and(|r| !r.is_empty()),
                "unresponsive_engines": body
                    .get("unresponsive_engines")
                    .cloned()
                    .unwrap_or_else(|| json!([])),
            }),
            None => json!({
                "status_code": response.status_code,
                "content_type": response.content_type(),
            }),
        };
        Ok(CheckOutcome::new(metadata))
    }
}

/// Spawns a trivial command to prove the script runtime is available
pub struct CommandRuntimeCheck {
    command: ShellCommand,
}

impl CommandRuntimeCheck {
    pub fn new(command: ShellCommand) -> Self {
        Self { command }
    }

    pub fn from_settings(settings: &CommandRuntimeSettings) -> Self {
        Self::new(
            ShellCommand::new(settings.program.clone(), settings.args.clone())
                .with_timeout(settings.timeout),
        )
    }
}

#[async_trait]
impl ServiceCheck for CommandRuntimeCheck {
    async fn check(&self, _correlation_id: &str) -> Result<CheckOutcome> {
        let output = self.command.run().await?;
        if !output.success {
            return Err(SentinelError::check_failed(format!(
                "PowerShell check failed: {}",
                output.stderr.trim()
            )));
        }

        let stdout = output.stdout.trim();
        let metadata = match serde_json::from_str::<Value>(stdout) {
            Ok(parsed) => json!({
                "available": true,
                "version": parsed.get("Version").cloned().unwrap_or(parsed),
            }),
            Err(_) => json!({ "available": true, "raw_output": stdout }),
        };
        Ok(CheckOutcome::new(metadata))
    }
}

/// Verifies the data directory is writable and its subdirectories exist
pub struct FilesystemCheck {
    data_dir: PathBuf,
    required_dirs: Vec<String>,
}

impl FilesystemCheck {
    pub fn new(data_dir: impl Into<PathBuf>, required_dirs: Vec<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            required_dirs,
        }
    }

    pub fn from_settings(settings: &FilesystemSettings) -> Self {
        Self::new(settings.data_dir.clone(), settings.required_dirs.clone())
    }

    async fn write_test(&self) -> std::io::Result<()> {
        let metadata = tokio::fs::metadata(&self.data_dir).await?;
        if !metadata.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("{} is not a directory", self.data_dir.display()),
            ));
        }

        let marker = self
            .data_dir
            .join(format!(".sentinel-write-test-{}", rand::random::<u32>()));
        tokio::fs::write(&marker, b"ok").await?;
        tokio::fs::remove_file(&marker).await
    }

    async fn is_usable(&self, dir: &str) -> bool {
        match tokio::fs::metadata(self.data_dir.join(dir)).await {
            Ok(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl ServiceCheck for FilesystemCheck {
    async fn check(&self, _correlation_id: &str) -> Result<CheckOutcome> {
        self.write_test().await.map_err(|e| {
            SentinelError::check_failed(format!(
                "File system check failed: {}: {}",
                self.data_dir.display(),
                e
            ))
        })?;

        let mut available = Vec::new();
        let mut missing = Vec::new();
        for dir in &self.required_dirs {
            if self.is_usable(dir).await {
                available.push(dir.as_str());
            } else {
                missing.push(dir.as_str());
            }
        }

        let mut outcome = CheckOutcome::new(json!({
            "data_directory": self.data_dir.display().to_string(),
            "available_directories": available,
            "missing_directories": missing,
            "all_directories_present": missing.is_empty(),
        }));
        if !missing.is_empty() {
            outcome = outcome.with_issue(format!("Missing directories: {}", missing.join(", ")));
        }
        Ok(outcome)
    }
}

/// Checks the UI dev server answers with 200
pub struct DevServerCheck {
    client: Arc<RetryingHttpClient>,
    url: String,
    timeout: Duration,
}

impl DevServerCheck {
    pub fn new(client: Arc<RetryingHttpClient>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    pub fn from_settings(client: Arc<RetryingHttpClient>, settings: &DevServerSettings) -> Self {
        Self::new(client, settings.url.clone(), settings.timeout)
    }
}

#[async_trait]
impl ServiceCheck for DevServerCheck {
    async fn check(&self, correlation_id: &str) -> Result<CheckOutcome> {
        let options = RequestOptions::get(self.url.as_str())
            .timeout(self.timeout)
            .max_retries(0);

        let response = expect_status(
            self.client.make_request(options, Some(correlation_id)).await,
            |status| status == 200,
            |status| format!("React UI returned status {}", status),
        )?;

        Ok(CheckOutcome::new(json!({
            "status_code": response.status_code,
            "content_type": response.content_type(),
        })))
    }
}

/// Definitions for every enabled built-in check
pub fn builtin_services(
    config: &crate::config::HealthConfig,
    client: Arc<RetryingHttpClient>,
) -> Vec<ServiceDefinition> {
    let mut services = Vec::new();

    let searxng = &config.searxng;
    if searxng.enabled {
        services.push(
            ServiceDefinition::new(
                "searxng",
                "SearxNG",
                Arc::new(SearchBackendCheck::from_settings(client.clone(), searxng)),
            )
            .critical(searxng.critical)
            .timeout(searxng.timeout),
        );
    }

    let powershell = &config.powershell;
    if powershell.enabled {
        services.push(
            ServiceDefinition::new(
                "powershell",
                "PowerShell",
                Arc::new(CommandRuntimeCheck::from_settings(powershell)),
            )
            .critical(powershell.critical)
            .timeout(powershell.timeout),
        );
    }

    let filesystem = &config.filesystem;
    if filesystem.enabled {
        services.push(
            ServiceDefinition::new(
                "filesystem",
                "File System",
                Arc::new(FilesystemCheck::from_settings(filesystem)),
            )
            .critical(filesystem.critical)
            .timeout(filesystem.timeout),
        );
    }

    let dev_server = &config.dev_server;
    if dev_server.enabled {
        services.push(
            ServiceDefinition::new(
                "react-ui",
                "React UI",
                Arc::new(DevServerCheck::from_settings(client, dev_server)),
            )
            .critical(dev_server.critical)
            .timeout(dev_server.timeout),
        );
    }

    services
}
