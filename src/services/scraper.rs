//! PowerShell scraping script runner
//!
//! Invokes the external LinkedIn/SearxNG collection scripts inside the
//! `powershell` circuit breaker. Only the invocation is handled here; the
//! scripts write their own result files.

use crate::config::ScraperConfig;
use crate::core::process::ShellCommand;
use crate::utils::error::{CircuitBreaker, Result, SentinelError};
use crate::utils::logging::StructuredLogger;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Parameters of one scraping run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeInvocation {
    pub searx_url: String,
    /// Defaults to the configured work dir
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    pub keywords: Vec<String>,
    #[serde(default = "default_export_format")]
    pub export_format: String,
    #[serde(default = "default_delay_seconds")]
    pub delay_seconds: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub use_cache: bool,
    #[serde(default)]
    pub open_results: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Throttle limit; runs the parallel script when set
    #[serde(default)]
    pub parallel: Option<u32>,
}

fn default_export_format() -> String {
    "csv".to_string()
}

fn default_delay_seconds() -> u32 {
    2
}

fn default_max_retries() -> u32 {
    3
}

impl ScrapeInvocation {
    pub fn new(searx_url: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            searx_url: searx_url.into(),
            work_dir: None,
            keywords,
            export_format: default_export_format(),
            delay_seconds: default_delay_seconds(),
            max_retries: default_max_retries(),
            use_cache: false,
            open_results: false,
            verbose: false,
            parallel: None,
        }
    }

    /// Script arguments, with `default_work_dir` used when none was given
    pub fn args(&self, default_work_dir: &Path) -> Vec<String> {
        let work_dir = self.work_dir.as_deref().unwrap_or(default_work_dir);
        let mut args = vec![
            "-SearxURL".to_string(),
            self.searx_url.clone(),
            "-WorkDir".to_string(),
            work_dir.display().to_string(),
            "-Keywords".to_string(),
            self.keywords.join(","),
            "-ExportFormat".to_string(),
            self.export_format.clone(),
            "-DelaySeconds".to_string(),
            self.delay_seconds.to_string(),
            "-MaxRetries".to_string(),
            self.max_retries.to_string(),
        ];

        if self.use_cache {
            args.push("-UseCache".to_string());
        }
        if self.open_results {
            args.push("-OpenResults".to_string());
        }
        if self.verbose {
            args.push("-Verbose".to_string());
        }
        if let Some(throttle_limit) = self.parallel {
            args.push("-Parallel".to_string());
            args.push("-ThrottleLimit".to_string());
            args.push(throttle_limit.to_string());
        }
        args
    }
}

/// Captured output of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOutput {
    pub script: PathBuf,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

pub struct ScriptRunner {
    config: ScraperConfig,
    breaker: Option<Arc<CircuitBreaker>>,
    logger: Arc<StructuredLogger>,
}

impl ScriptRunner {
    pub fn new(
        config: ScraperConfig,
        breaker: Option<Arc<CircuitBreaker>>,
        logger: Arc<StructuredLogger>,
    ) -> Self {
        Self {
            config,
            breaker,
            logger,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// The full command line a run would execute
    pub fn command_for(&self, invocation: &ScrapeInvocation) -> ShellCommand {
        let script = if invocation.parallel.is_some() {
            &self.config.parallel_script
        } else {
            &self.config.script
        };
        let work_dir = invocation
            .work_dir
            .clone()
            .unwrap_or_else(|| self.config.work_dir.clone());

        let mut args = vec![
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-File".to_string(),
            script.display().to_string(),
        ];
        args.extend(invocation.args(&self.config.work_dir));

        ShellCommand::new(self.config.executable.clone(), args)
            .with_timeout(self.config.timeout)
            .in_dir(work_dir)
    }

    /// Run a scraping script to completion
    pub async fn run(
        &self,
        invocation: &ScrapeInvocation,
        correlation_id: Option<&str>,
    ) -> Result<ScriptOutput> {
        if invocation.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(SentinelError::config("At least one keyword is required"));
        }

        let command = self.command_for(invocation);
        let script = if invocation.parallel.is_some() {
            self.config.parallel_script.clone()
        } else {
            self.config.script.clone()
        };

        self.logger.info(
            "Running PowerShell script",
            correlation_id,
            json!({
                "script": script.display().to_string(),
                "keywords": invocation.keywords.len(),
                "parallel": invocation.parallel,
            }),
        );

        let run = || run_once(&command, &script);

        let result = match &self.breaker {
            Some(breaker) => breaker.execute(run, correlation_id).await,
            None => run().await,
        };

        match &result {
            Ok(output) => {
                self.logger.success(
                    "PowerShell script completed",
                    correlation_id,
                    json!({ "duration": output.duration_ms }),
                );
            }
            Err(error) => {
                self.logger.error(
                    "PowerShell script failed",
                    correlation_id,
                    json!({ "error": error.to_string() }),
                );
            }
        }
        result
    }
}

async fn run_once(command: &ShellCommand, script: &Path) -> Result<ScriptOutput> {
    let started = Instant::now();
    let output = command.run().await?;
    if !output.success {
        return Err(SentinelError::command(format!(
            "PowerShell script failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(ScriptOutput {
        script: script.to_path_buf(),
        stdout: output.stdout,
        stderr: output.stderr,
        duration_ms: started.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CircuitBreakerConfig;

    fn logger() -> Arc<StructuredLogger> {
        Arc::new(StructuredLogger::new("scraper-test"))
    }

    fn invocation() -> ScrapeInvocation {
        ScrapeInvocation::new(
            "http://localhost:8888",
            vec!["rust engineer".to_string(), "site reliability".to_string()],
        )
    }

    #[test]
    fn test_minimal_arguments() {
        let args = invocation().args(Path::new("/srv/collector"));
        assert_eq!(
            args,
            vec![
                "-SearxURL",
                "http://localhost:8888",
                "-WorkDir",
                "/srv/collector",
                "-Keywords",
                "rust engineer,site reliability",
                "-ExportFormat",
                "csv",
                "-DelaySeconds",
                "2",
                "-MaxRetries",
                "3",
            ]
        );
    }

    #[test]
    fn test_flags_and_parallel_arguments() {
        let invocation = ScrapeInvocation {
            work_dir: Some(PathBuf::from("/data")),
            export_format: "json".to_string(),
            use_cache: true,
            open_results: true,
            verbose: true,
            parallel: Some(4),
            ..invocation()
        };

        let args = invocation.args(Path::new("/ignored"));
        assert_eq!(args[3], "/data");
        assert_eq!(args[7], "json");
        assert_eq!(
            &args[12..],
            &["-UseCache", "-OpenResults", "-Verbose", "-Parallel", "-ThrottleLimit", "4"]
        );
    }

    #[test]
    fn test_command_line_selects_script() {
        let runner = ScriptRunner::new(ScraperConfig::default(), None, logger());

        let sequential = runner.command_for(&invocation());
        assert_eq!(sequential.program, "powershell.exe");
        assert_eq!(
            &sequential.args[..4],
            &["-ExecutionPolicy", "Bypass", "-File", "packages/scripts/ScriptQueries.ps1"]
        );

        let parallel = runner.command_for(&ScrapeInvocation {
            parallel: Some(2),
            ..invocation()
        });
        assert_eq!(parallel.args[3], "packages/scripts/ScriptQueriesParallel.ps1");
    }

    #[test]
    fn test_invocation_deserializes_with_defaults() {
        let invocation: ScrapeInvocation = serde_json::from_value(json!({
            "searxUrl": "http://localhost:8888",
            "keywords": ["rust"],
            "useCache": true,
        }))
        .unwrap();

        assert_eq!(invocation.export_format, "csv");
        assert_eq!(invocation.delay_seconds, 2);
        assert!(invocation.use_cache);
        assert_eq!(invocation.parallel, None);
    }

    #[tokio::test]
    async fn test_empty_keywords_rejected() {
        let runner = ScriptRunner::new(ScraperConfig::default(), None, logger());
        let err = runner
            .run(&ScrapeInvocation::new("http://localhost:8888", vec![]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::Config(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failures_count_against_breaker() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fake_shell = dir.path().join("fake-powershell");
        std::fs::write(&fake_shell, "#!/bin/sh\necho 'script exploded' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&fake_shell, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ScraperConfig {
            executable: fake_shell.display().to_string(),
            work_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let breaker = Arc::new(
            CircuitBreaker::new(
                CircuitBreakerConfig {
                    failure_threshold: 1,
                    ..CircuitBreakerConfig::new("powershell")
                },
                logger(),
            )
            .unwrap(),
        );
        let runner = ScriptRunner::new(config, Some(breaker.clone()), logger());

        let err = runner.run(&invocation(), Some("cid")).await.unwrap_err();
        assert_eq!(err.to_string(), "PowerShell script failed: script exploded");

        let err = runner.run(&invocation(), Some("cid")).await.unwrap_err();
        assert!(err.is_circuit_open());
        assert_eq!(breaker.status().stats.total_failures, 1);
    }
}
