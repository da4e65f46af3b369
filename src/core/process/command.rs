//! External command execution

use crate::config::CommandSpec;
use crate::utils::error::{Result, SentinelError};
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A program with arguments, run without a shell
#[derive(Debug, Clone, PartialEq)]
pub struct ShellCommand {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub current_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Trimmed stderr, or the exit code when stderr is empty
    pub fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

impl ShellCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: crate::config::default_command_timeout(),
            current_dir: None,
        }
    }

    pub fn from_spec(spec: &CommandSpec) -> Self {
        Self::new(spec.program.clone(), spec.args.clone()).with_timeout(spec.timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Run to completion and capture its output
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    /// A non-zero exit is not an error; check [`CommandOutput::success`].
    pub async fn run(&self) -> Result<CommandOutput> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        let child = command
            .spawn()
            .map_err(|e| SentinelError::command(format!("Failed to spawn '{}': {}", self, e)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutput {
                code: output.status.code(),
                success: output.status.success(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(SentinelError::command(format!(
                "Failed to wait for '{}': {}",
                self, e
            ))),
            Err(_) => Err(SentinelError::timeout(format!(
                "'{}' did not finish within {}ms",
                self,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Run and fail unless the command exits successfully; returns trimmed stdout
    pub async fn run_checked(&self, operation: &str) -> Result<String> {
        let output = self.run().await?;
        if output.success {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(SentinelError::command(format!(
                "{} command failed: {}",
                operation,
                output.failure_reason()
            )))
        }
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
