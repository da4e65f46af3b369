//! Sentinel facade integration tests
//!
//! Health aggregation, breaker gating and lifecycle through the public API.

#[cfg(test)]
mod tests {
    use crate::common::TestEnv;
    use collector_sentinel::{
        CircuitState, OverallStatus, ScrapeInvocation, Sentinel, SentinelError, ServiceStatus,
    };
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn search_backend(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(serde_json::json!({ "results": [], "unresponsive_engines": [] })),
            )
            .mount(&server)
            .await;
        server
    }

    // ==================== Health aggregation ====================

    #[tokio::test]
    async fn test_all_systems_operational() {
        let server = search_backend(200).await;
        let env = TestEnv::new().with_search_backend(&server.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let snapshot = sentinel.force_check_all().await;

        assert_eq!(snapshot.overall_status, OverallStatus::Healthy);
        assert_eq!(snapshot.overall_message, "All systems operational");
        assert_eq!(snapshot.services.len(), 2);
        assert_eq!(snapshot.healthy_services(), 2);

        let searxng = sentinel.service("searxng").unwrap();
        assert_eq!(searxng.metadata["status_code"], 200);
        assert_eq!(searxng.metadata["has_results"], false);
    }

    #[tokio::test]
    async fn test_critical_service_down() {
        let server = search_backend(503).await;
        let env = TestEnv::new().with_search_backend(&server.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let snapshot = sentinel.force_check_all().await;

        assert_eq!(snapshot.overall_status, OverallStatus::Critical);
        assert_eq!(snapshot.overall_message, "Critical services down: SearxNG");

        let searxng = sentinel.service("searxng").unwrap();
        assert_eq!(searxng.status, ServiceStatus::Unhealthy);
        assert_eq!(searxng.failure_count, 1);
        assert!(!searxng.issues.is_empty());
    }

    #[tokio::test]
    async fn test_slow_critical_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let env = TestEnv::new().with_search_backend(&server.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let started = std::time::Instant::now();
        let snapshot = sentinel.force_check_all().await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(snapshot.overall_status, OverallStatus::Critical);
        assert_eq!(snapshot.overall_message, "Critical services down: SearxNG");

        let searxng = sentinel.service("searxng").unwrap();
        assert_eq!(searxng.status, ServiceStatus::Unhealthy);
        assert!(searxng.uptime < 100.0);
        assert_eq!(
            sentinel.service("filesystem").unwrap().status,
            ServiceStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_non_critical_service_degrades() {
        let ui = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&ui)
            .await;

        let env = TestEnv::new().with_dev_server(&ui.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let snapshot = sentinel.force_check_all().await;

        assert_eq!(snapshot.overall_status, OverallStatus::Degraded);
        assert_eq!(
            snapshot.overall_message,
            "Non-critical services degraded: React UI"
        );
        assert_eq!(
            sentinel.service("react-ui").unwrap().issues,
            vec!["React UI returned status 404".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_data_directory_is_critical() {
        let mut env = TestEnv::new();
        env.config.health.filesystem.data_dir = env.data_dir().join("does-not-exist");
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let snapshot = sentinel.force_check_all().await;

        assert_eq!(snapshot.overall_status, OverallStatus::Critical);
        assert_eq!(snapshot.overall_message, "Critical services down: File System");
    }

    #[tokio::test]
    async fn test_health_history_records_cycles() {
        let env = TestEnv::new();
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        assert_eq!(
            sentinel.status_report().overall.overall_status,
            OverallStatus::Unknown
        );

        for _ in 0..3 {
            sentinel.force_check_all().await;
        }

        assert_eq!(sentinel.health_history(10).len(), 3);
        assert_eq!(sentinel.health_history(2).len(), 2);
        assert_eq!(sentinel.service("filesystem").unwrap().total_checks, 3);
    }

    #[tokio::test]
    async fn test_force_check_unknown_service() {
        let env = TestEnv::new();
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let err = sentinel.force_check("nope").await.unwrap_err();
        assert!(matches!(err, SentinelError::NotFound(_)));
        assert_eq!(err.to_string(), "Not found: Service not found: nope");
    }

    // ==================== Circuit breakers ====================

    #[tokio::test]
    async fn test_failing_backend_opens_breaker() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
            .expect(2)
            .mount(&server)
            .await;

        let env = TestEnv::new().with_search_backend(&server.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        sentinel.force_check("searxng").await.unwrap();
        sentinel.force_check("searxng").await.unwrap();

        let breaker = sentinel
            .circuit_breakers()
            .into_iter()
            .find(|b| b.name == "searxng")
            .unwrap();
        assert_eq!(breaker.state, CircuitState::Open);
        assert_eq!(breaker.stats.total_failures, 2);

        // Rejected without reaching the server
        let record = sentinel.force_check("searxng").await.unwrap();
        assert_eq!(record.status, ServiceStatus::Unhealthy);
        assert_eq!(record.failure_count, 3);

        let snapshot = sentinel.force_check_all().await;
        let reported = snapshot
            .circuit_breakers
            .iter()
            .find(|b| b.name == "searxng")
            .unwrap();
        assert_eq!(reported.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_manual_breaker_control() {
        let server = search_backend(200).await;
        let env = TestEnv::new().with_search_backend(&server.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let status = sentinel.force_open_circuit_breaker("searxng").unwrap();
        assert_eq!(status.state, CircuitState::Open);
        assert_eq!(
            sentinel.force_check("searxng").await.unwrap().status,
            ServiceStatus::Unhealthy
        );

        let status = sentinel.reset_circuit_breaker("searxng").unwrap();
        assert_eq!(status.state, CircuitState::Closed);
        assert_eq!(
            sentinel.force_check("searxng").await.unwrap().status,
            ServiceStatus::Healthy
        );

        let err = sentinel.reset_circuit_breaker("missing").unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    // ==================== Reports and lifecycle ====================

    #[tokio::test]
    async fn test_status_report_serializes_camel_case() {
        let env = TestEnv::new();
        let sentinel = Sentinel::new(env.config.clone()).unwrap();
        sentinel.force_check_all().await;

        let report = serde_json::to_value(sentinel.status_report()).unwrap();

        assert_eq!(report["overall"]["overallStatus"], "healthy");
        assert_eq!(report["services"][0]["id"], "filesystem");
        assert!(report["circuitBreakers"].is_array());
        assert!(report["connections"].is_object());
    }

    #[tokio::test]
    async fn test_start_runs_first_cycle_and_stop_halts() {
        let env = TestEnv::new();
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        sentinel.start().unwrap();
        assert!(sentinel.health_monitor().is_running());
        assert!(sentinel.process_monitor().is_running());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while sentinel.health_history(1).is_empty() {
            assert!(tokio::time::Instant::now() < deadline, "no health cycle ran");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            sentinel.status_report().overall.overall_status,
            OverallStatus::Healthy
        );

        sentinel.stop();
        assert!(!sentinel.health_monitor().is_running());
        assert!(!sentinel.process_monitor().is_running());
    }

    #[tokio::test]
    async fn test_restart_after_stop_reopens_http() {
        let server = search_backend(200).await;
        let env = TestEnv::new().with_search_backend(&server.uri());
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        sentinel.start().unwrap();
        sentinel.stop();
        assert!(sentinel.connection_stats().http.closed);

        sentinel.start().unwrap();
        assert!(!sentinel.connection_stats().http.closed);
        assert!(sentinel.health_monitor().is_running());

        let record = sentinel.force_check("searxng").await.unwrap();
        assert_eq!(record.status, ServiceStatus::Healthy);
        assert!(record.issues.is_empty());

        sentinel.stop();
    }

    #[tokio::test]
    async fn test_scrape_requires_keywords() {
        let env = TestEnv::new();
        let sentinel = Sentinel::new(env.config.clone()).unwrap();

        let err = sentinel
            .run_scrape(&ScrapeInvocation::new("http://localhost:8888", vec![" ".to_string()]))
            .await
            .unwrap_err();
        assert!(matches!(err, SentinelError::Config(_)));
        assert_eq!(sentinel.logger().active_contexts(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut env = TestEnv::new();
        env.config.health.max_history_entries = 0;

        let err = Sentinel::new(env.config.clone()).err().unwrap();
        assert!(matches!(err, SentinelError::Config(_)));
    }
}
