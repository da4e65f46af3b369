//! Test suite for collector-sentinel
//!
//! ## Test Categories
//!
//! ### 1. Common Utilities (`common/`)
//! Config fixtures backed by temporary data directories
//!
//! ### 2. Integration Tests (`integration/`)
//! The `Sentinel` facade end to end against mock HTTP servers and local
//! shell commands
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all tests
//! cargo test
//!
//! # Run only unit tests
//! cargo test --lib
//!
//! # Run integration tests
//! cargo test --test lib
//! ```

pub mod common;
pub mod integration;
