//! Utility modules for the sentinel
//!
//! - **error**: error type, circuit breakers and their registry
//! - **logging**: structured logger, correlation contexts, daily log files
//! - **net**: retrying HTTP client and connection pools

pub mod error;
pub mod logging;
pub mod net;
