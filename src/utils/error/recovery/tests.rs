//! Tests for circuit breakers

#[cfg(test)]
mod tests {
    use super::super::{
        BreakerRoute, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
        ExpectedErrorSpec,
    };
    use crate::utils::error::{NetworkErrorCode, SentinelError};
    use crate::utils::logging::StructuredLogger;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn logger() -> Arc<StructuredLogger> {
        Arc::new(StructuredLogger::new("test"))
    }

    fn breaker(threshold: u32, open_for: Duration) -> CircuitBreaker {
        let config = CircuitBreakerConfig {
            failure_threshold: threshold,
            timeout: open_for,
            ..CircuitBreakerConfig::new("test")
        };
        CircuitBreaker::new(config, logger()).unwrap()
    }

    async fn fail(breaker: &CircuitBreaker, message: &str) -> SentinelError {
        breaker
            .execute(
                || async { Err::<(), _>(SentinelError::command(message)) },
                None,
            )
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn test_circuit_breaker_success() {
        let breaker = breaker(3, Duration::from_secs(30));

        let result = breaker.execute(|| async { Ok(42) }, None).await;
        assert_eq!(result.unwrap(), 42);

        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert!(status.is_healthy);
        assert_eq!(status.stats.total_requests, 1);
        assert_eq!(status.stats.total_successes, 1);
        assert!(status.stats.last_response.is_some());
    }

    #[tokio::test]
    async fn test_opens_at_threshold() {
        let breaker = breaker(3, Duration::from_secs(30));

        fail(&breaker, "boom").await;
        fail(&breaker, "boom").await;
        assert_eq!(breaker.state(), CircuitState::Closed);

        fail(&breaker, "boom").await;
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Open);
        assert_eq!(status.stats.total_circuit_open_events, 1);
        assert!(status.time_until_next_attempt_ms > 0);
        assert!(!status.is_healthy);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_without_running() {
        let breaker = breaker(1, Duration::from_secs(30));
        fail(&breaker, "boom").await;

        let calls = AtomicU32::new(0);
        let err = breaker
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                },
                None,
            )
            .await
            .unwrap_err();

        assert!(err.is_circuit_open());
        assert!(err.to_string().starts_with("Circuit breaker [test] is OPEN"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let stats = breaker.status().stats;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_timeouts, 1);
    }

    #[tokio::test]
    async fn test_success_resets_failure_count() {
        let breaker = breaker(3, Duration::from_secs(30));
        fail(&breaker, "boom").await;
        fail(&breaker, "boom").await;
        assert_eq!(breaker.status().failure_count, 2);

        breaker.execute(|| async { Ok(()) }, None).await.unwrap();
        assert_eq!(breaker.status().failure_count, 0);

        fail(&breaker, "boom").await;
        fail(&breaker, "boom").await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_success_closes() {
        let breaker = breaker(2, Duration::from_millis(50));
        fail(&breaker, "boom").await;
        fail(&breaker, "boom").await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        breaker.execute(|| async { Ok(()) }, None).await.unwrap();
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, 0);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let breaker = breaker(2, Duration::from_millis(50));
        fail(&breaker, "boom").await;
        fail(&breaker, "boom").await;

        tokio::time::sleep(Duration::from_millis(80)).await;

        fail(&breaker, "still down").await;
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Open);
        assert_eq!(status.failure_count, 3);
        assert_eq!(status.stats.total_circuit_open_events, 2);
    }

    #[tokio::test]
    async fn test_expected_errors_are_not_counted() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            expected_errors: vec![ExpectedErrorSpec::contains("ECONNREFUSED")],
            ..CircuitBreakerConfig::new("test")
        };
        let breaker = CircuitBreaker::new(config, logger()).unwrap();

        for _ in 0..5 {
            let err = breaker
                .execute(
                    || async {
                        Err::<(), _>(SentinelError::network(
                            NetworkErrorCode::ConnectionRefused,
                            "connection refused",
                        ))
                    },
                    None,
                )
                .await
                .unwrap_err();
            assert_eq!(err.network_code(), Some(NetworkErrorCode::ConnectionRefused));
        }

        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(status.failure_count, 0);
        assert_eq!(status.stats.total_failures, 5);
        assert!(status.last_failure_time.is_some());
    }

    #[tokio::test]
    async fn test_try_recovery() {
        let breaker = breaker(1, Duration::from_millis(30));
        assert!(!breaker.try_recovery());

        fail(&breaker, "boom").await;
        assert!(!breaker.try_recovery());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(breaker.try_recovery());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn test_monitoring_moves_to_half_open() {
        let config = CircuitBreakerConfig {
            failure_threshold: 1,
            timeout: Duration::from_millis(20),
            monitoring_period: Duration::from_millis(10),
            ..CircuitBreakerConfig::new("test")
        };
        let breaker = Arc::new(CircuitBreaker::new(config, logger()).unwrap());
        breaker.start_monitoring();
        assert!(breaker.is_monitoring());

        fail(&breaker, "boom").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.stop_monitoring();
        assert!(!breaker.is_monitoring());
    }

    #[tokio::test]
    async fn test_monitoring_does_not_keep_breaker_alive() {
        let config = CircuitBreakerConfig {
            monitoring_period: Duration::from_millis(10),
            ..CircuitBreakerConfig::new("test")
        };
        let breaker = Arc::new(CircuitBreaker::new(config, logger()).unwrap());
        breaker.start_monitoring();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let weak = Arc::downgrade(&breaker);
        drop(breaker);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_zero_monitoring_period_rejected() {
        let config = CircuitBreakerConfig {
            monitoring_period: Duration::ZERO,
            ..CircuitBreakerConfig::new("test")
        };
        let err = CircuitBreaker::new(config, logger()).err().unwrap();
        assert!(matches!(err, SentinelError::Config(_)));
        assert!(err.to_string().contains("monitoring_period must be greater than 0"));
    }

    #[tokio::test]
    async fn test_force_open_and_close() {
        let breaker = breaker(5, Duration::from_secs(30));

        breaker.force_open();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(breaker.execute(|| async { Ok(()) }, None).await.is_err());

        breaker.force_close();
        let status = breaker.status();
        assert_eq!(status.state, CircuitState::Closed);
        assert!(status.next_attempt.is_none());
        assert_eq!(status.time_until_next_attempt_ms, 0);
        assert!(breaker.execute(|| async { Ok(()) }, None).await.is_ok());
    }

    #[test]
    fn test_average_response_time() {
        let breaker = breaker(5, Duration::from_secs(30));
        breaker.on_success(100.0, None);
        breaker.on_success(200.0, None);
        breaker.on_success(50.0, None);
        assert_eq!(breaker.status().stats.average_response_time_ms, 100.0);
    }

    #[test]
    fn test_registry_routes() {
        let registry = CircuitBreakerRegistry::new(
            &[
                CircuitBreakerConfig::searxng(),
                CircuitBreakerConfig::powershell(),
            ],
            logger(),
        )
        .unwrap();

        let name = |url: &str| registry.resolve_for_url(url).map(|b| b.name().to_string());
        assert_eq!(name("http://localhost:8888/search").as_deref(), Some("searxng"));
        assert_eq!(name("https://searx.example.org/").as_deref(), Some("searxng"));
        assert_eq!(name("http://localhost:5173/"), None);
        assert_eq!(name("not a url"), None);
    }

    #[test]
    fn test_registry_route_requires_all_fields() {
        let config = CircuitBreakerConfig {
            routes: vec![BreakerRoute {
                host_contains: Some("api".to_string()),
                port: Some(443),
            }],
            ..CircuitBreakerConfig::new("api")
        };
        let registry = CircuitBreakerRegistry::new(&[config], logger()).unwrap();

        assert!(registry.resolve_for_url("https://api.example.com/").is_some());
        assert!(registry.resolve_for_url("http://api.example.com/").is_none());
    }

    #[test]
    fn test_registry_unknown_name() {
        let registry =
            CircuitBreakerRegistry::new(&[CircuitBreakerConfig::searxng()], logger()).unwrap();

        assert!(matches!(
            registry.reset("missing"),
            Err(SentinelError::NotFound(_))
        ));
        assert!(matches!(
            registry.force_open("missing"),
            Err(SentinelError::NotFound(_))
        ));

        let status = registry.force_open("searxng").unwrap();
        assert_eq!(status.state, CircuitState::Open);
        let status = registry.reset("searxng").unwrap();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(registry.names(), vec!["searxng".to_string()]);
    }
}
