//! Retrying HTTP client gated by circuit breakers

use super::pool::ConnectionPool;
use super::retry::{RetryPolicy, classify_transport_error, is_retryable_status, should_retry};
use super::types::{
    ConnectionStats, HealthCheckResult, HttpClientConfig, HttpResponse, RequestOptions,
    ResponseData,
};
use crate::utils::error::{CircuitBreakerRegistry, Result, SentinelError};
use crate::utils::logging::StructuredLogger;
use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";
const CORRELATION_HEADER: &str = "X-Correlation-ID";

pub struct RetryingHttpClient {
    config: HttpClientConfig,
    retry: RetryPolicy,
    http: ConnectionPool,
    https: ConnectionPool,
    breakers: Option<Arc<CircuitBreakerRegistry>>,
    logger: Arc<StructuredLogger>,
}

impl RetryingHttpClient {
    pub fn new(
        config: HttpClientConfig,
        breakers: Option<Arc<CircuitBreakerRegistry>>,
        logger: Arc<StructuredLogger>,
    ) -> Result<Self> {
        let http = ConnectionPool::new("http", &config)?;
        let https = ConnectionPool::new("https", &config)?;

        logger.info(
            "HTTP Client initialized",
            None,
            json!({
                "maxRetries": config.max_retries,
                "baseDelay": config.base_delay.as_millis() as u64,
                "maxDelay": config.max_delay.as_millis() as u64,
                "defaultTimeout": config.timeout.as_millis() as u64,
            }),
        );

        Ok(Self {
            retry: RetryPolicy::from_config(&config),
            config,
            http,
            https,
            breakers,
            logger,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Send a request, retrying transient failures
    ///
    /// A correlation context is created for the request when none is given
    /// and released once it completes.
    pub async fn make_request(
        &self,
        options: RequestOptions,
        correlation_id: Option<&str>,
    ) -> Result<HttpResponse> {
        match correlation_id {
            Some(id) => self.request_with_retries(&options, id).await,
            None => {
                let id = self.logger.create_context();
                let result = self.request_with_retries(&options, &id).await;
                self.logger.release_context(&id);
                result
            }
        }
    }

    async fn request_with_retries(
        &self,
        options: &RequestOptions,
        correlation_id: &str,
    ) -> Result<HttpResponse> {
        let method = options.method.as_str();
        let url = options.url.as_str();
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);
        let cid = Some(correlation_id);

        self.logger.network_request(
            method,
            url,
            cid,
            json!({
                "headers": options.headers,
                "timeout": timeout.as_millis() as u64,
            }),
        );

        let breaker = self
            .breakers
            .as_ref()
            .and_then(|registry| registry.resolve_for_url(url));

        let mut attempt = 0;
        loop {
            attempt += 1;
            let started = Instant::now();

            let outcome = match &breaker {
                Some(breaker) => {
                    breaker
                        .execute(|| self.send_once(options, correlation_id, timeout), cid)
                        .await
                }
                None => self.send_once(options, correlation_id, timeout).await,
            };
            let duration = started.elapsed().as_millis() as u64;

            let error = match outcome {
                Ok(response) => {
                    self.logger.network_response(
                        method,
                        url,
                        response.status_code,
                        duration,
                        cid,
                        json!({
                            "attempt": attempt,
                            "responseSize": response.raw_data.len(),
                        }),
                    );
                    return Ok(response);
                }
                Err(error) => error,
            };

            if attempt <= max_retries && should_retry(Some(&error), None) {
                let delay = self.retry.calculate_delay(attempt);
                let delay_ms = delay.as_millis() as u64;

                self.logger.network_error(
                    method,
                    url,
                    &error,
                    cid,
                    json!({
                        "attempt": attempt,
                        "duration": duration,
                        "willRetry": true,
                        "retryDelay": delay_ms,
                    }),
                );
                self.logger.warn(
                    &format!(
                        "Request failed, retrying in {}ms (attempt {}/{})",
                        delay_ms, attempt, max_retries
                    ),
                    cid,
                    json!({
                        "method": method,
                        "url": url,
                        "error": error.to_string(),
                        "attempt": attempt,
                        "delay": delay_ms,
                    }),
                );

                tokio::time::sleep(delay).await;
                continue;
            }

            self.logger.network_error(
                method,
                url,
                &error,
                cid,
                json!({
                    "attempt": attempt,
                    "duration": duration,
                    "willRetry": false,
                    "finalFailure": true,
                }),
            );
            self.logger.error(
                &format!("Request failed after {} attempts", attempt),
                cid,
                json!({
                    "method": method,
                    "url": url,
                    "error": error.to_string(),
                    "totalAttempts": attempt,
                }),
            );
            return Err(error);
        }
    }

    /// One transport round trip
    ///
    /// Retryable statuses come back as [`SentinelError::HttpStatus`] so that
    /// they count as breaker failures.
    async fn send_once(
        &self,
        options: &RequestOptions,
        correlation_id: &str,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let pool = self.pool_for(&options.url)?;
        let (client, _permit) = pool.acquire().await?;
        let headers = build_headers(&options.headers, correlation_id)?;

        let started = Instant::now();
        let mut request = client
            .request(options.method.clone(), options.url.as_str())
            .headers(headers)
            .timeout(timeout);

        request = match &options.body {
            Some(Value::String(text)) => request.body(text.clone()),
            Some(body) => request.json(body),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, timeout))?;

        let status_code = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let raw_data = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e, timeout))?;

        if is_retryable_status(status_code) {
            return Err(SentinelError::HttpStatus {
                status: status_code,
                body: raw_data,
            });
        }

        let content_type = headers.get("content-type").map(String::as_str).unwrap_or("");
        let data = ResponseData::decode(content_type, &raw_data);
        if content_type.contains("application/json") && matches!(data, ResponseData::Text(_)) {
            self.logger.debug(
                "Failed to parse JSON response, keeping as string",
                Some(correlation_id),
                json!({ "contentType": content_type, "dataLength": raw_data.len() }),
            );
        }

        Ok(HttpResponse {
            status_code,
            headers,
            data,
            raw_data,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn pool_for(&self, url: &str) -> Result<&ConnectionPool> {
        let parsed =
            Url::parse(url).map_err(|e| SentinelError::config(format!("Invalid URL '{}': {}", url, e)))?;
        match parsed.scheme() {
            "http" => Ok(&self.http),
            "https" => Ok(&self.https),
            scheme => Err(SentinelError::config(format!(
                "Unsupported URL scheme '{}'. Only http and https are supported",
                scheme
            ))),
        }
    }

    // ==================== Convenience methods ====================

    pub async fn get(&self, url: &str, correlation_id: Option<&str>) -> Result<HttpResponse> {
        self.make_request(RequestOptions::get(url), correlation_id)
            .await
    }

    pub async fn post(
        &self,
        url: &str,
        body: Value,
        correlation_id: Option<&str>,
    ) -> Result<HttpResponse> {
        self.make_request(RequestOptions::new(Method::POST, url).body(body), correlation_id)
            .await
    }

    pub async fn put(
        &self,
        url: &str,
        body: Value,
        correlation_id: Option<&str>,
    ) -> Result<HttpResponse> {
        self.make_request(RequestOptions::new(Method::PUT, url).body(body), correlation_id)
            .await
    }

    pub async fn delete(&self, url: &str, correlation_id: Option<&str>) -> Result<HttpResponse> {
        self.make_request(RequestOptions::new(Method::DELETE, url), correlation_id)
            .await
    }

    /// Health-check `url`; never fails, the outcome is in the result
    pub async fn health_check(
        &self,
        url: &str,
        timeout: Duration,
        correlation_id: Option<&str>,
    ) -> HealthCheckResult {
        let options = RequestOptions::get(url)
            .header("Accept", "application/json, text/html, */*")
            .timeout(timeout);

        let started = Instant::now();
        match self.make_request(options, correlation_id).await {
            Ok(response) => HealthCheckResult {
                success: true,
                healthy: (200..400).contains(&response.status_code),
                status_code: Some(response.status_code),
                response_time_ms: response.duration_ms,
                error: None,
            },
            Err(error) => HealthCheckResult {
                success: false,
                healthy: false,
                status_code: match &error {
                    SentinelError::HttpStatus { status, .. } => Some(*status),
                    _ => None,
                },
                response_time_ms: started.elapsed().as_millis() as u64,
                error: Some(error.to_string()),
            },
        }
    }

    pub fn connection_stats(&self) -> ConnectionStats {
        ConnectionStats {
            http: self.http.stats(),
            https: self.https.stats(),
        }
    }

    /// Close both pools; later requests fail with [`SentinelError::Shutdown`]
    pub fn shutdown(&self) {
        self.http.shutdown();
        self.https.shutdown();
        self.logger
            .info("HTTP Client connections destroyed", None, Value::Null);
    }

    /// Reopen pools closed by [`shutdown`](Self::shutdown)
    pub fn reopen(&self) -> Result<()> {
        if !self.http.is_closed() && !self.https.is_closed() {
            return Ok(());
        }
        self.http.reopen()?;
        self.https.reopen()?;
        self.logger
            .info("HTTP Client connections reopened", None, Value::Null);
        Ok(())
    }
}

fn build_headers(extra: &HashMap<String, String>, correlation_id: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

    for (name, value) in extra {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SentinelError::config(format!("Invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| SentinelError::config(format!("Invalid header value for '{}': {}", name, e)))?;
        headers.insert(name, value);
    }

    let correlation = HeaderValue::from_str(correlation_id).map_err(|e| {
        SentinelError::config(format!("Invalid correlation ID '{}': {}", correlation_id, e))
    })?;
    headers.insert(CORRELATION_HEADER, correlation);
    Ok(headers)
}
