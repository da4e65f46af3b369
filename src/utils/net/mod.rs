//! Network utilities

pub mod client;

// Re-export commonly used types and functions
pub use client::{
    ConnectionStats, HealthCheckResult, HttpResponse, RequestOptions, ResponseData,
    RetryingHttpClient,
};
