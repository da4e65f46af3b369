//! Health monitoring for the services the collector depends on
//!
//! # Module Structure
//!
//! - `types` - Service records, snapshots and change events
//! - `checker` - The `ServiceCheck` trait and closure adapter
//! - `checks` - Built-in checks (SearxNG, PowerShell, file system, UI)
//! - `monitor` - Polling loop, aggregation and history
//! - `tests` - Test suite for health monitoring

pub mod checker;
pub mod checks;
pub mod monitor;
pub mod types;

pub use checker::{FnCheck, ServiceCheck};
pub use checks::{
    CommandRuntimeCheck, DevServerCheck, FilesystemCheck, SearchBackendCheck, builtin_services,
};
pub use monitor::HealthMonitor;
pub use types::{
    CheckOutcome, HealthChangeEvent, HealthSnapshot, OverallStatus, ServiceDefinition,
    ServiceRecord, ServiceStatus, ServiceSummary, aggregate,
};
