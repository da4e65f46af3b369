//! Configuration integration tests
//!
//! The shipped example config must load and match the built-in defaults.

#[cfg(test)]
mod tests {
    use collector_sentinel::config::ControllerSpec;
    use collector_sentinel::{Config, Sentinel, SentinelError};
    use std::time::Duration;

    const EXAMPLE: &str = include_str!("../../config/sentinel.yaml.example");

    #[test]
    fn test_example_config_loads() {
        let config = Config::from_yaml(EXAMPLE).unwrap();

        assert_eq!(config.logging.retention_days, 7);
        assert_eq!(config.http_client.max_retries, 3);
        assert_eq!(config.http_client.max_delay, Duration::from_secs(30));

        let names: Vec<_> = config.circuit_breakers.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["searxng", "powershell"]);
        assert_eq!(config.circuit_breakers[0].failure_threshold, 3);
        assert_eq!(config.circuit_breakers[0].routes.len(), 2);

        assert_eq!(config.health.check_interval, Duration::from_secs(30));
        assert!(!config.health.dev_server.critical);
        assert_eq!(config.health.filesystem.required_dirs.len(), 4);

        assert_eq!(config.process.max_restart_attempts, 3);
        assert_eq!(config.process.restart_cooldown, Duration::from_secs(60));
        assert!(matches!(
            &config.process.processes[0].controller,
            ControllerSpec::Docker { container } if container == "searxng"
        ));
        assert_eq!(config.scraper.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_example_matches_defaults() {
        let example = Config::from_yaml(EXAMPLE).unwrap();
        let defaults = Config::default();

        assert_eq!(example.to_yaml().unwrap(), defaults.to_yaml().unwrap());
    }

    #[test]
    fn test_sentinel_builds_from_partial_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            r#"
logging:
  log_dir: {}
health:
  searxng:
    enabled: false
  powershell:
    enabled: false
  dev_server:
    enabled: false
  filesystem:
    data_dir: {}
process:
  processes: []
"#,
            dir.path().join("logs").display(),
            dir.path().display()
        );

        let config = Config::from_yaml(&yaml).unwrap();
        let sentinel = Sentinel::new(config).unwrap();

        let ids: Vec<_> = sentinel.services().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["filesystem"]);
        assert!(sentinel.processes().is_empty());
        assert_eq!(sentinel.circuit_breakers().len(), 2);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "health:\n  check_interval: 0\n",
            "health:\n  searxng:\n    url: not a url\n",
            "process:\n  max_restart_history: 0\n",
            "circuit_breakers:\n  - name: a\n  - name: a\n",
            "scraper:\n  executable: ''\n",
        ];

        for yaml in cases {
            let err = Config::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, SentinelError::Config(_)), "accepted: {}", yaml);
        }
    }

    #[test]
    fn test_unknown_controller_type_rejected() {
        let yaml = r#"
process:
  processes:
    - id: x
      name: X
      controller:
        type: systemd
        unit: x.service
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }
}
