use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

pub use crate::config::{HttpClientConfig, PoolConfig};

/// One logical request; retries reuse the same options
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub url: String,
    pub method: Method,
    pub headers: HashMap<String, String>,
    /// JSON body; a JSON string is sent verbatim as text
    pub body: Option<Value>,
    /// Overrides the client timeout
    pub timeout: Option<Duration>,
    /// Overrides the client retry count
    pub max_retries: Option<u32>,
}

impl RequestOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HashMap::new(),
            body: None,
            timeout: None,
            max_retries: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// Decoded response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    Json(Value),
    Text(String),
}

impl ResponseData {
    /// Parse as JSON when the content type says so and the body parses
    pub fn decode(content_type: &str, raw: &str) -> Self {
        if content_type.contains("application/json") && !raw.trim().is_empty() {
            if let Ok(value) = serde_json::from_str(raw) {
                return ResponseData::Json(value);
            }
        }
        ResponseData::Text(raw.to_string())
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            ResponseData::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub data: ResponseData,
    pub raw_data: String,
    pub duration_ms: u64,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> &str {
        self.header("content-type").unwrap_or_default()
    }
}

/// Result of [`RetryingHttpClient::health_check`](super::RetryingHttpClient::health_check)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    pub success: bool,
    pub healthy: bool,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub error: Option<String>,
}

/// Usage of one scheme's pool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub active: usize,
    pub available: usize,
    pub max_active: usize,
    pub max_idle_per_host: usize,
    pub idle_timeout_ms: u64,
    pub total_requests: u64,
    pub closed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub http: PoolStats,
    pub https: PoolStats,
}
