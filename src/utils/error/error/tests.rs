//! Tests for error handling

use super::types::{NetworkErrorCode, SentinelError};
use chrono::Utc;

#[test]
fn test_not_found_helper() {
    let error = SentinelError::not_found("Service not found: ghost");
    assert!(matches!(error, SentinelError::NotFound(ref msg) if msg == "Service not found: ghost"));
    assert_eq!(error.status_code(), 404);
}

#[test]
fn test_circuit_open_marker() {
    let error = SentinelError::CircuitOpen {
        name: "searxng".to_string(),
        next_attempt: Utc::now(),
    };
    assert!(error.is_circuit_open());
    assert!(error.to_string().contains("Circuit breaker [searxng] is OPEN"));
    assert_eq!(error.status_code(), 503);

    assert!(!SentinelError::timeout("slow").is_circuit_open());
}

#[test]
fn test_network_error_display_carries_code() {
    let error = SentinelError::network(NetworkErrorCode::ConnectionRefused, "connect failed");
    assert_eq!(error.to_string(), "Network error (ECONNREFUSED): connect failed");
    assert_eq!(error.network_code(), Some(NetworkErrorCode::ConnectionRefused));
}

#[test]
fn test_check_failed_display_is_bare_message() {
    let error = SentinelError::check_failed("timeout");
    assert_eq!(error.to_string(), "timeout");
}

#[test]
fn test_retryable_codes() {
    for code in NetworkErrorCode::RETRYABLE {
        assert!(code.is_retryable(), "{} should be retryable", code);
    }
    assert!(!NetworkErrorCode::Other.is_retryable());
}

#[test]
fn test_io_kind_mapping() {
    use std::io::ErrorKind;
    assert_eq!(
        NetworkErrorCode::from_io_kind(ErrorKind::ConnectionRefused),
        NetworkErrorCode::ConnectionRefused
    );
    assert_eq!(
        NetworkErrorCode::from_io_kind(ErrorKind::ConnectionReset),
        NetworkErrorCode::ConnectionReset
    );
    assert_eq!(
        NetworkErrorCode::from_io_kind(ErrorKind::TimedOut),
        NetworkErrorCode::TimedOut
    );
    assert_eq!(
        NetworkErrorCode::from_io_kind(ErrorKind::PermissionDenied),
        NetworkErrorCode::Other
    );
}
