//! Core functionality of the sentinel
//!
//! Health and process monitoring, plus the [`Sentinel`] facade that wires
//! them to the breaker registry and HTTP client.

pub mod health;
pub mod process;
pub mod sentinel;

pub use sentinel::{Sentinel, StatusReport};
