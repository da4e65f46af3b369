//! Error Handling utilities
//!
//! This module provides the error taxonomy and the circuit breaker used to
//! isolate failing dependencies.

pub mod error;
pub mod recovery;

// Re-export commonly used types and functions
pub use error::*;
pub use recovery::*;
