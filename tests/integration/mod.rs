//! Integration tests for collector-sentinel
//!
//! These tests drive the public facade and verify how the components
//! interact.

pub mod config_tests;
pub mod process_tests;
pub mod sentinel_tests;
