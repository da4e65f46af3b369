//! Process control capabilities

use super::command::ShellCommand;
use super::types::ResourceUsage;
use crate::config::ControllerSpec;
use crate::utils::error::{Result, SentinelError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Check, start, stop and sample one external process
#[async_trait]
pub trait ProcessController: Send + Sync {
    /// Whether the process is up; an error means the check itself failed
    async fn is_running(&self) -> Result<bool>;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    fn supports_start(&self) -> bool;

    fn supports_stop(&self) -> bool;

    async fn resource_usage(&self) -> Result<ResourceUsage> {
        Err(SentinelError::unsupported("resource sampling"))
    }
}

/// Build the controller a config entry describes
pub fn controller_from_spec(spec: &ControllerSpec) -> Arc<dyn ProcessController> {
    match spec {
        ControllerSpec::Docker { container } => Arc::new(CommandController::docker(container)),
        ControllerSpec::Command {
            check,
            start,
            stop,
            stats,
            expect_output,
        } => Arc::new(CommandController {
            check: ShellCommand::from_spec(check),
            start: start.as_ref().map(ShellCommand::from_spec),
            stop: stop.as_ref().map(ShellCommand::from_spec),
            stats: stats.as_ref().map(ShellCommand::from_spec),
            expect_output: expect_output.clone(),
        }),
    }
}

/// Controls a process through external commands
#[derive(Debug, Clone)]
pub struct CommandController {
    /// Succeeds with non-empty output while the process runs
    pub check: ShellCommand,
    pub start: Option<ShellCommand>,
    pub stop: Option<ShellCommand>,
    /// Prints `<cpu>% <memory>` such as `1.5% 120MiB / 2GiB`
    pub stats: Option<ShellCommand>,
    pub expect_output: Option<String>,
}

impl CommandController {
    pub fn new(check: ShellCommand) -> Self {
        Self {
            check,
            start: None,
            stop: None,
            stats: None,
            expect_output: None,
        }
    }

    /// Commands for a Docker container managed outside the sentinel
    pub fn docker(container: &str) -> Self {
        let docker = |args: &[&str]| {
            ShellCommand::new("docker", args.iter().map(|a| a.to_string()).collect())
        };
        Self {
            check: docker(&["ps", "--filter", &format!("name={}", container), "--format", "{{.Names}}"]),
            start: Some(docker(&["start", container])),
            stop: Some(docker(&["stop", container])),
            stats: Some(docker(&[
                "stats",
                "--no-stream",
                "--format",
                "{{.CPUPerc}} {{.MemUsage}}",
                container,
            ])),
            expect_output: Some(container.to_string()),
        }
    }

    pub fn with_start(mut self, start: ShellCommand) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_stop(mut self, stop: ShellCommand) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_stats(mut self, stats: ShellCommand) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn expecting(mut self, output: impl Into<String>) -> Self {
        self.expect_output = Some(output.into());
        self
    }
}

#[async_trait]
impl ProcessController for CommandController {
    async fn is_running(&self) -> Result<bool> {
        let output = self.check.run().await?;
        if !output.success {
            return Ok(false);
        }
        let stdout = output.stdout.trim();
        Ok(!stdout.is_empty()
            && self
                .expect_output
                .as_deref()
                .is_none_or(|expected| stdout.contains(expected)))
    }

    async fn start(&self) -> Result<()> {
        match &self.start {
            Some(command) => command.run_checked("start").await.map(drop),
            None => Err(SentinelError::unsupported("No start command defined for process")),
        }
    }

    async fn stop(&self) -> Result<()> {
        match &self.stop {
            Some(command) => command.run_checked("stop").await.map(drop),
            None => Err(SentinelError::unsupported("No stop command defined for process")),
        }
    }

    fn supports_start(&self) -> bool {
        self.start.is_some()
    }

    fn supports_stop(&self) -> bool {
        self.stop.is_some()
    }

    async fn resource_usage(&self) -> Result<ResourceUsage> {
        let Some(command) = &self.stats else {
            return Err(SentinelError::unsupported("No stats command defined for process"));
        };
        let output = command.run_checked("stats").await?;
        parse_stats(&output)
    }
}

type Predicate = Box<dyn Fn() -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Running check through a custom async predicate
pub struct PredicateController {
    predicate: Predicate,
    start: Option<ShellCommand>,
    stop: Option<ShellCommand>,
}

impl PredicateController {
    pub fn new<F, Fut>(predicate: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        Self {
            predicate: Box::new(move || Box::pin(predicate())),
            start: None,
            stop: None,
        }
    }

    pub fn with_start(mut self, start: ShellCommand) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_stop(mut self, stop: ShellCommand) -> Self {
        self.stop = Some(stop);
        self
    }
}

#[async_trait]
impl ProcessController for PredicateController {
    async fn is_running(&self) -> Result<bool> {
        (self.predicate)().await
    }

    async fn start(&self) -> Result<()> {
        match &self.start {
            Some(command) => command.run_checked("start").await.map(drop),
            None => Err(SentinelError::unsupported("No start command defined for process")),
        }
    }

    async fn stop(&self) -> Result<()> {
        match &self.stop {
            Some(command) => command.run_checked("stop").await.map(drop),
            None => Err(SentinelError::unsupported("No stop command defined for process")),
        }
    }

    fn supports_start(&self) -> bool {
        self.start.is_some()
    }

    fn supports_stop(&self) -> bool {
        self.stop.is_some()
    }
}

/// Parse `<cpu>% <used> [/ <limit>]` as printed by `docker stats`
pub fn parse_stats(output: &str) -> Result<ResourceUsage> {
    let invalid = || SentinelError::command(format!("Unrecognised stats output: '{}'", output));

    let mut parts = output.split_whitespace();
    let cpu_percent = parts
        .next()
        .and_then(|cpu| cpu.trim_end_matches('%').parse::<f64>().ok())
        .ok_or_else(invalid)?;
    let memory_mb = parts.next().and_then(parse_memory_mb).ok_or_else(invalid)?;

    Ok(ResourceUsage {
        cpu_percent,
        memory_mb,
    })
}

fn parse_memory_mb(value: &str) -> Option<f64> {
    let split = value
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;
    let factor = match unit {
        "" | "B" => 1.0 / (1024.0 * 1024.0),
        "KiB" | "kB" | "KB" => 1.0 / 1024.0,
        "MiB" | "MB" => 1.0,
        "GiB" | "GB" => 1024.0,
        "TiB" | "TB" => 1024.0 * 1024.0,
        _ => return None,
    };
    Some(number * factor)
}
