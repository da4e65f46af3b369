//! # Collector Sentinel
//!
//! Operational resilience layer for the SearxNG job collector.
//!
//! ## Features
//!
//! - **Circuit breakers**: per-dependency failure isolation with timed recovery
//! - **Retrying HTTP client**: exponential backoff with jitter over pooled connections
//! - **Health monitoring**: periodic checks with weighted averages and overall status
//! - **Process supervision**: cooldown-limited restarts of external processes
//! - **Structured logging**: correlation ids and daily JSON log files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collector_sentinel::{Config, Sentinel};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/sentinel.yaml").await?;
//!     let sentinel = Sentinel::new(config)?;
//!     sentinel.start()?;
//!
//!     let snapshot = sentinel.force_check_all().await;
//!     println!("{}: {}", snapshot.overall_status, snapshot.overall_message);
//!
//!     sentinel.stop();
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod config;
pub mod core;
pub mod services;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use core::health::{HealthMonitor, HealthSnapshot, OverallStatus, ServiceStatus};
pub use core::process::{ProcessMonitor, ProcessStatus};
pub use core::sentinel::{Sentinel, StatusReport};
pub use services::scraper::{ScrapeInvocation, ScriptRunner};
pub use utils::error::{CircuitBreaker, CircuitBreakerRegistry, CircuitState, Result, SentinelError};
pub use utils::net::RetryingHttpClient;

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Description of the crate
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
