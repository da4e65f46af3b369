//! HTTP client
//!
//! Retrying client with exponential backoff, per-scheme connection pools and
//! circuit breaker gating by target URL.

mod http_client;
mod pool;
pub mod retry;
pub mod types;

pub use http_client::RetryingHttpClient;
pub use pool::ConnectionPool;
pub use retry::{RetryPolicy, is_retryable_status, should_retry};
pub use types::{
    ConnectionStats, HealthCheckResult, HttpResponse, PoolStats, RequestOptions, ResponseData,
};
