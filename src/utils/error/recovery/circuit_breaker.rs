//! Circuit breaker implementation for fault tolerance

use super::matcher::{ExpectedError, is_expected};
use super::types::{BreakerStats, CircuitBreakerConfig, CircuitBreakerStatus, CircuitState};
use crate::config::Validate;
use crate::utils::error::{Result, SentinelError};
use crate::utils::logging::StructuredLogger;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::debug;

/// Mutable breaker state, always updated under one lock
#[derive(Debug, Default)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<DateTime<Utc>>,
    next_attempt: Option<DateTime<Utc>>,
    stats: BreakerStats,
}

/// Outcome of the admission check at the start of `execute`
enum Admission {
    Run,
    Trial,
    Rejected(DateTime<Utc>),
}

/// Circuit breaker guarding one named dependency
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    expected_errors: Vec<ExpectedError>,
    inner: Mutex<BreakerState>,
    logger: Arc<StructuredLogger>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    ///
    /// Fails with [`SentinelError::Config`] when `config` does not validate,
    /// e.g. on a zero `monitoring_period`.
    pub fn new(config: CircuitBreakerConfig, logger: Arc<StructuredLogger>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| SentinelError::Config(format!("Circuit breaker config error: {}", e)))?;

        let expected_errors = config
            .expected_errors
            .iter()
            .map(ExpectedError::from_spec)
            .collect::<Result<Vec<_>>>()?;

        logger.info(
            &format!("Circuit Breaker [{}] initialized", config.name),
            None,
            json!({
                "failureThreshold": config.failure_threshold,
                "timeout": config.timeout.as_millis() as u64,
                "monitoringPeriod": config.monitoring_period.as_millis() as u64,
            }),
        );

        Ok(Self {
            config,
            expected_errors,
            inner: Mutex::new(BreakerState::default()),
            logger,
            monitor: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Run `operation` under circuit breaker protection
    ///
    /// While the circuit is open the operation is not run and the call fails
    /// with [`SentinelError::CircuitOpen`].
    pub async fn execute<T, F, Fut>(&self, operation: F, correlation_id: Option<&str>) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match self.admit() {
            Admission::Rejected(next_attempt) => {
                let wait_ms = (next_attempt - Utc::now()).num_milliseconds().max(0);
                self.logger.circuit_breaker_event(
                    &self.config.name,
                    "REQUEST_BLOCKED",
                    json!({
                        "nextAttempt": next_attempt.to_rfc3339(),
                        "timeUntilNextAttempt": wait_ms,
                    }),
                    correlation_id,
                );
                return Err(SentinelError::CircuitOpen {
                    name: self.config.name.clone(),
                    next_attempt,
                });
            }
            Admission::Trial => {
                self.logger.circuit_breaker_event(
                    &self.config.name,
                    "HALF_OPEN",
                    json!("Attempting recovery"),
                    correlation_id,
                );
            }
            Admission::Run => {}
        }

        let started = Instant::now();
        let result = operation().await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(_) => self.on_success(elapsed_ms, correlation_id),
            Err(error) => self.on_failure(error, elapsed_ms, correlation_id),
        }
        result
    }

    fn admit(&self) -> Admission {
        let mut inner = self.inner.lock();
        inner.stats.total_requests += 1;

        if inner.state != CircuitState::Open {
            return Admission::Run;
        }
        match inner.next_attempt {
            Some(next) if Utc::now() < next => {
                inner.stats.total_timeouts += 1;
                Admission::Rejected(next)
            }
            _ => {
                inner.state = CircuitState::HalfOpen;
                Admission::Trial
            }
        }
    }

    /// Record a successful operation
    pub fn on_success(&self, response_time_ms: f64, correlation_id: Option<&str>) {
        let (recovered, state, success_count) = {
            let mut inner = self.inner.lock();
            inner.success_count += 1;
            inner.stats.total_successes += 1;
            inner.stats.record_response_time(response_time_ms);
            inner.stats.last_response = Some(Utc::now());
            inner.failure_count = 0;

            let recovered = inner.state == CircuitState::HalfOpen;
            if recovered {
                inner.state = CircuitState::Closed;
            }
            (recovered, inner.state, inner.success_count)
        };

        if recovered {
            self.logger.circuit_breaker_event(
                &self.config.name,
                "CLOSED",
                json!("Circuit recovered after successful request"),
                correlation_id,
            );
        }

        self.logger.success(
            &format!("Circuit Breaker [{}] - Operation successful", self.config.name),
            correlation_id,
            json!({
                "responseTime": response_time_ms,
                "state": state,
                "successCount": success_count,
            }),
        );
    }

    /// Record a failed operation
    pub fn on_failure(
        &self,
        error: &SentinelError,
        response_time_ms: f64,
        correlation_id: Option<&str>,
    ) {
        let message = error.to_string();
        let expected = is_expected(&self.expected_errors, &message);

        let (failure_count, state, opened) = {
            let mut inner = self.inner.lock();
            inner.stats.total_failures += 1;
            inner.last_failure_time = Some(Utc::now());
            inner.stats.record_response_time(response_time_ms);

            if expected {
                (inner.failure_count, inner.state, None)
            } else {
                inner.failure_count += 1;
                let trip = inner.state == CircuitState::HalfOpen
                    || inner.failure_count >= self.config.failure_threshold;
                let opened = if trip {
                    Some(self.open_locked(&mut inner))
                } else {
                    None
                };
                (inner.failure_count, inner.state, opened)
            }
        };

        if expected {
            self.logger.warn(
                &format!(
                    "Circuit Breaker [{}] - Expected error (not counted)",
                    self.config.name
                ),
                correlation_id,
                json!({ "error": message, "responseTime": response_time_ms }),
            );
            return;
        }

        self.logger.error(
            &format!("Circuit Breaker [{}] - Operation failed", self.config.name),
            correlation_id,
            json!({
                "error": message,
                "responseTime": response_time_ms,
                "failureCount": failure_count,
                "threshold": self.config.failure_threshold,
                "state": state,
            }),
        );

        if let Some(next_attempt) = opened {
            self.log_opened(failure_count, next_attempt, correlation_id);
        }
    }

    fn open_locked(&self, inner: &mut BreakerState) -> DateTime<Utc> {
        let next_attempt = Utc::now()
            + chrono::Duration::from_std(self.config.timeout)
                .unwrap_or_else(|_| chrono::Duration::zero());
        inner.state = CircuitState::Open;
        inner.next_attempt = Some(next_attempt);
        inner.stats.total_circuit_open_events += 1;
        next_attempt
    }

    fn log_opened(&self, failure_count: u32, next_attempt: DateTime<Utc>, correlation_id: Option<&str>) {
        self.logger.circuit_breaker_event(
            &self.config.name,
            "OPEN",
            json!(format!("Circuit opened after {} failures", failure_count)),
            correlation_id,
        );
        self.logger.error(
            &format!("Circuit Breaker [{}] - CIRCUIT OPENED", self.config.name),
            correlation_id,
            json!({
                "failureCount": failure_count,
                "nextAttempt": next_attempt.to_rfc3339(),
                "timeoutDuration": self.config.timeout.as_millis() as u64,
            }),
        );
    }

    /// Move OPEN to HALF_OPEN once the open period has elapsed
    pub fn try_recovery(&self) -> bool {
        let recovered = {
            let mut inner = self.inner.lock();
            let due = inner.state == CircuitState::Open
                && inner.next_attempt.is_none_or(|next| Utc::now() >= next);
            if due {
                inner.state = CircuitState::HalfOpen;
            }
            due
        };

        if recovered {
            self.logger.circuit_breaker_event(
                &self.config.name,
                "HALF_OPEN_AUTO",
                json!("Auto-transitioning to HALF_OPEN for recovery attempt"),
                None,
            );
        }
        recovered
    }

    /// Close the circuit and clear failure state
    pub fn force_close(&self) {
        {
            let mut inner = self.inner.lock();
            inner.state = CircuitState::Closed;
            inner.failure_count = 0;
            inner.success_count = 0;
            inner.last_failure_time = None;
            inner.next_attempt = None;
        }
        self.logger.circuit_breaker_event(
            &self.config.name,
            "FORCE_CLOSED",
            json!("Circuit manually closed"),
            None,
        );
    }

    /// Open the circuit regardless of the failure count
    pub fn force_open(&self) {
        let (failure_count, next_attempt) = {
            let mut inner = self.inner.lock();
            let next_attempt = self.open_locked(&mut inner);
            (inner.failure_count, next_attempt)
        };
        self.log_opened(failure_count, next_attempt, None);
        self.logger.circuit_breaker_event(
            &self.config.name,
            "FORCE_OPENED",
            json!("Circuit manually opened"),
            None,
        );
    }

    pub fn status(&self) -> CircuitBreakerStatus {
        let inner = self.inner.lock();
        let time_until_next_attempt_ms = inner
            .next_attempt
            .map(|next| (next - Utc::now()).num_milliseconds().max(0) as u64)
            .unwrap_or(0);

        CircuitBreakerStatus {
            name: self.config.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
            next_attempt: inner.next_attempt,
            stats: inner.stats.clone(),
            is_healthy: inner.state == CircuitState::Closed,
            time_until_next_attempt_ms,
        }
    }

    fn log_status(&self) {
        let status = self.status();
        self.logger.health(
            &format!("Circuit Breaker [{}] Status: {}", status.name, status.state),
            None,
            json!({
                "state": status.state,
                "failureCount": status.failure_count,
                "successCount": status.success_count,
                "stats": status.stats,
            }),
        );
    }

    /// Spawn the periodic status and recovery task
    pub fn start_monitoring(self: &Arc<Self>) {
        let mut monitor = self.monitor.lock();
        if monitor.is_some() {
            debug!("Circuit breaker [{}] monitoring already running", self.config.name);
            return;
        }

        let breaker = Arc::downgrade(self);
        let period = self.config.monitoring_period;
        *monitor = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(breaker) = breaker.upgrade() else {
                    break;
                };
                breaker.log_status();
                breaker.try_recovery();
            }
        }));
    }

    pub fn stop_monitoring(&self) {
        if let Some(handle) = self.monitor.lock().take() {
            handle.abort();
            self.logger.info(
                &format!(
                    "Circuit Breaker [{}] destroyed and monitoring stopped",
                    self.config.name
                ),
                None,
                serde_json::Value::Null,
            );
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.lock().is_some()
    }
}
