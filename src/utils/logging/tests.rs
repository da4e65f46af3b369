//! Tests for the structured logger

#[cfg(test)]
mod tests {
    use super::super::{CorrelationStore, DailyFileWriter, LogLevel, StructuredLogger};
    use serde_json::{Value, json};
    use std::fs;

    #[test]
    fn test_correlation_id_format() {
        let id = CorrelationStore::generate_id();
        let (millis, suffix) = id.split_once('-').unwrap();

        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 9);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        let a = CorrelationStore::generate_id();
        let b = CorrelationStore::generate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_context_metadata_is_merged() {
        let logger = StructuredLogger::new("test");
        let id = logger.create_context();
        logger.update_context(&id, json!({ "operation": "check", "attempt": 1 }));

        let entry = logger.info("checking", Some(&id), json!({ "attempt": 2 }));

        assert_eq!(entry.correlation_id.as_deref(), Some(id.as_str()));
        assert_eq!(entry.metadata["operation"], json!("check"));
        assert_eq!(entry.metadata["attempt"], json!(2));
        assert!(entry.duration.is_some());
    }

    #[test]
    fn test_release_context() {
        let logger = StructuredLogger::new("test");
        let id = logger.create_context_with("fixed-id");
        assert_eq!(id, "fixed-id");
        assert_eq!(logger.active_contexts(), 1);

        logger.release_context(&id);
        assert_eq!(logger.active_contexts(), 0);

        let entry = logger.info("after release", Some(&id), Value::Null);
        assert!(entry.duration.is_none());
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn test_network_response_level_follows_status() {
        let logger = StructuredLogger::new("test");

        let ok = logger.network_response("GET", "http://a", 200, 5, None, Value::Null);
        let redirect = logger.network_response("GET", "http://a", 302, 5, None, Value::Null);
        let failed = logger.network_response("GET", "http://a", 503, 5, None, Value::Null);

        assert_eq!(ok.level, LogLevel::Info);
        assert_eq!(redirect.level, LogLevel::Warn);
        assert_eq!(failed.level, LogLevel::Error);
        assert_eq!(failed.message, "GET http://a - 503");
        assert_eq!(failed.metadata["statusCode"], json!(503));
    }

    #[test]
    fn test_circuit_breaker_event_message() {
        let logger = StructuredLogger::new("test");
        let entry = logger.circuit_breaker_event("searxng", "OPENED", json!({}), None);

        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.message, "Circuit Breaker [searxng] - OPENED");
        assert_eq!(entry.metadata["type"], json!("circuit_breaker"));
    }

    #[test]
    fn test_level_filtering() {
        assert!(LogLevel::Error.passes(LogLevel::Info));
        assert!(LogLevel::Health.passes(LogLevel::Info));
        assert!(!LogLevel::Debug.passes(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_file_output_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = StructuredLogger::new("sentinel")
            .with_file_output(dir.path())
            .unwrap();

        let entry = logger.success("done", None, json!({ "count": 3 }));

        let path = dir.path().join(format!(
            "sentinel-{}.log",
            entry.timestamp.format("%Y-%m-%d")
        ));
        let contents = fs::read_to_string(path).unwrap();
        let line: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();

        assert_eq!(line["level"], json!("SUCCESS"));
        assert_eq!(line["message"], json!("done"));
        assert_eq!(line["component"], json!("sentinel"));
        assert_eq!(line["metadata"]["count"], json!(3));
    }

    #[test]
    fn test_cleanup_keeps_recent_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = DailyFileWriter::new(dir.path(), "sentinel").unwrap();
        fs::write(dir.path().join("sentinel-2000-01-01.log"), "{}\n").unwrap();

        let removed = writer.cleanup(7).unwrap();

        assert!(removed.is_empty());
        assert!(dir.path().join("sentinel-2000-01-01.log").exists());

        let removed = writer.cleanup(0).unwrap();
        assert_eq!(removed.len(), 1);
    }
}
