//! Process monitoring and auto-restart
//!
//! Externally managed processes (the SearxNG container by default) are
//! checked on an interval and restarted through their controller when they
//! stop. Restarts are also scheduled reactively when the health monitor sees
//! a mapped service degrade.

pub mod command;
pub mod controller;
pub mod monitor;
pub mod types;

pub use command::{CommandOutput, ShellCommand};
pub use controller::{
    CommandController, PredicateController, ProcessController, controller_from_spec, parse_stats,
};
pub use monitor::ProcessMonitor;
pub use types::{
    ProcessDefinition, ProcessRecord, ProcessStatus, ResourceUsage, RestartHistoryEntry,
    RestartReason,
};
