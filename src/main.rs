//! Collector Sentinel - resilience daemon for the SearxNG collector
//!
//! Runs circuit breaker monitoring, health checks and process supervision
//! until interrupted.

#![allow(missing_docs)]

use anyhow::Context;
use clap::Parser;
use collector_sentinel::utils::logging::init_tracing;
use collector_sentinel::{Config, Sentinel};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "sentinel", version, about = "Resilience daemon for the SearxNG collector")]
struct Cli {
    /// YAML configuration file; defaults plus environment overrides when omitted
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Run one round of health checks, print the report and exit
    #[arg(long)]
    once: bool,
}

async fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_ref()).await?;
    init_tracing(&config.logging);

    let sentinel = Sentinel::new(config)?;

    if cli.once {
        sentinel.force_check_all().await;
        let report = serde_json::to_string_pretty(&sentinel.status_report())?;
        println!("{}", report);
        return Ok(());
    }

    sentinel.start()?;
    info!("Sentinel running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    info!("Shutdown signal received");
    sentinel.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
