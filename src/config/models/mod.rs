//! Configuration data models
//!
//! This module defines all configuration structures used throughout the sentinel.

#![allow(missing_docs)]

pub mod breaker;
pub mod health;
pub mod http;
pub mod logging;
pub mod process;
pub mod scraper;

// Re-export all configuration types
pub use breaker::*;
pub use health::*;
pub use http::*;
pub use logging::*;
pub use process::*;
pub use scraper::*;

/// Default SearxNG instance
pub fn default_searx_url() -> String {
    "http://localhost:8888".to_string()
}

/// Default UI dev server
pub fn default_ui_url() -> String {
    "http://localhost:5173".to_string()
}

/// Default data directory
pub fn default_data_dir() -> std::path::PathBuf {
    std::path::PathBuf::from("data")
}

/// Durations are written as integer milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
