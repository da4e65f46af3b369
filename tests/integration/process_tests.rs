//! Process supervision through the facade
//!
//! The supervised "process" is a marker file driven by `sh` commands:
//! running while the file exists, since the check prints only then.

#[cfg(all(test, unix))]
mod tests {
    use crate::common::TestEnv;
    use collector_sentinel::config::{CommandSpec, ControllerSpec, ProcessSpec};
    use collector_sentinel::core::process::RestartReason;
    use collector_sentinel::{ProcessStatus, Sentinel, SentinelError};
    use std::path::Path;
    use std::time::Duration;

    fn sh(script: String) -> CommandSpec {
        CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script],
            timeout: Duration::from_secs(5),
        }
    }

    fn marker_process(marker: &Path, start_creates_marker: bool) -> ProcessSpec {
        let marker = marker.display();
        let start = if start_creates_marker {
            format!("touch '{}'", marker)
        } else {
            "true".to_string()
        };
        ProcessSpec {
            id: "worker".to_string(),
            name: "Collector Worker".to_string(),
            critical: true,
            auto_restart: true,
            dependencies: Vec::new(),
            controller: ControllerSpec::Command {
                check: sh(format!("test -f '{}' && echo running", marker)),
                start: Some(sh(start)),
                stop: Some(sh(format!("rm -f '{}'", marker))),
                stats: None,
                expect_output: None,
            },
        }
    }

    fn sentinel_with(env: &mut TestEnv, spec: ProcessSpec) -> Sentinel {
        env.config.process.processes = vec![spec];
        Sentinel::new(env.config.clone()).unwrap()
    }

    #[tokio::test]
    async fn test_running_process_left_alone() {
        let mut env = TestEnv::new();
        let marker = env.data_dir().join("worker.pid");
        std::fs::write(&marker, "1").unwrap();
        let sentinel = sentinel_with(&mut env, marker_process(&marker, true));

        sentinel.process_monitor().perform_process_check().await;

        let record = sentinel.process("worker").unwrap();
        assert_eq!(record.status, ProcessStatus::Running);
        assert_eq!(record.restart_count, 0);
        assert!(sentinel.restart_history(10).is_empty());
    }

    #[tokio::test]
    async fn test_stopped_process_restarted() {
        let mut env = TestEnv::new();
        let marker = env.data_dir().join("worker.pid");
        let sentinel = sentinel_with(&mut env, marker_process(&marker, true));

        sentinel.process_monitor().perform_process_check().await;

        assert!(marker.exists());
        let record = sentinel.process("worker").unwrap();
        assert_eq!(record.status, ProcessStatus::Running);
        assert_eq!(record.restart_count, 1);
        assert!(!record.is_restarting);

        let history = sentinel.restart_history(10);
        assert_eq!(history.len(), 1);
        assert!(history[0].success);
        assert_eq!(history[0].reason, RestartReason::AutomaticRestart);
        assert_eq!(history[0].process_name, "Collector Worker");
    }

    #[tokio::test]
    async fn test_restart_attempts_capped() {
        let mut env = TestEnv::new();
        let marker = env.data_dir().join("worker.pid");
        let sentinel = sentinel_with(&mut env, marker_process(&marker, false));

        for _ in 0..5 {
            sentinel.process_monitor().perform_process_check().await;
        }

        let record = sentinel.process("worker").unwrap();
        assert_eq!(record.restart_count, 3);
        assert_eq!(record.status, ProcessStatus::Stopped);

        let history = sentinel.restart_history(10);
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|entry| !entry.success));
        assert_eq!(history[0].attempt, 3);
        assert_eq!(
            history[0].error.as_deref(),
            Some("Process failed to start after restart command")
        );

        let record = sentinel.reset_restart_count("worker").unwrap();
        assert_eq!(record.restart_count, 0);
    }

    #[tokio::test]
    async fn test_manual_stop_and_start() {
        let mut env = TestEnv::new();
        let marker = env.data_dir().join("worker.pid");
        std::fs::write(&marker, "1").unwrap();
        let sentinel = sentinel_with(&mut env, marker_process(&marker, true));

        let record = sentinel.stop_process("worker").await.unwrap();
        assert_eq!(record.status, ProcessStatus::Stopped);
        assert!(!marker.exists());

        let entry = sentinel.start_process("worker").await.unwrap().unwrap();
        assert!(entry.success);
        assert_eq!(entry.reason, RestartReason::Manual);
        assert!(marker.exists());
        assert_eq!(
            sentinel.process("worker").unwrap().status,
            ProcessStatus::Running
        );
    }

    #[tokio::test]
    async fn test_unknown_process() {
        let mut env = TestEnv::new();
        let marker = env.data_dir().join("worker.pid");
        let sentinel = sentinel_with(&mut env, marker_process(&marker, true));

        let err = sentinel.process("ghost").unwrap_err();
        assert!(matches!(err, SentinelError::NotFound(_)));
        assert!(sentinel.start_process("ghost").await.is_err());
    }
}
