//! Error handling for the sentinel
//!
//! This module defines all error types used throughout the crate.

mod helpers;
#[cfg(test)]
mod tests;
mod types;

pub use types::{NetworkErrorCode, Result, SentinelError};
