//! Common test utilities for collector-sentinel

pub mod fixtures;

pub use fixtures::TestEnv;
