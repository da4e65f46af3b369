//! Scraping script configuration

use super::duration_ms;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// PowerShell executable
    pub executable: String,
    pub script: PathBuf,
    /// Script used when a run asks for parallel execution
    pub parallel_script: PathBuf,
    /// Working directory passed to the scripts when a run names none
    pub work_dir: PathBuf,
    /// Runs are killed after this long
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            executable: "powershell.exe".to_string(),
            script: PathBuf::from("packages/scripts/ScriptQueries.ps1"),
            parallel_script: PathBuf::from("packages/scripts/ScriptQueriesParallel.ps1"),
            work_dir: PathBuf::from("."),
            timeout: Duration::from_secs(300),
        }
    }
}
