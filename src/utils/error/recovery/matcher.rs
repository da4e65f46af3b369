//! Expected-error matchers

use super::types::ExpectedErrorSpec;
use crate::utils::error::{Result, SentinelError};
use regex::Regex;

/// A failure that should not count toward opening a circuit
#[derive(Debug, Clone)]
pub enum ExpectedError {
    /// Error text contains this substring
    Contains(String),
    /// Error text matches this regex
    Pattern(Regex),
}

impl ExpectedError {
    pub fn from_spec(spec: &ExpectedErrorSpec) -> Result<Self> {
        match spec {
            ExpectedErrorSpec::Contains { contains } => Ok(ExpectedError::Contains(contains.clone())),
            ExpectedErrorSpec::Pattern { pattern } => Regex::new(pattern)
                .map(ExpectedError::Pattern)
                .map_err(|e| SentinelError::config(format!("Invalid expected error pattern: {}", e))),
        }
    }

    pub fn matches(&self, message: &str) -> bool {
        match self {
            ExpectedError::Contains(needle) => message.contains(needle.as_str()),
            ExpectedError::Pattern(regex) => regex.is_match(message),
        }
    }
}

/// Whether any matcher accepts the message
pub fn is_expected(matchers: &[ExpectedError], message: &str) -> bool {
    matchers.iter().any(|m| m.matches(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_case_sensitive() {
        let matcher = ExpectedError::from_spec(&ExpectedErrorSpec::contains("timeout")).unwrap();
        assert!(matcher.matches("request timeout after 5000ms"));
        assert!(!matcher.matches("Timeout error"));
    }

    #[test]
    fn test_pattern() {
        let matcher =
            ExpectedError::from_spec(&ExpectedErrorSpec::pattern("(?i)execution policy")).unwrap();
        assert!(matcher.matches("File cannot be loaded: Execution Policy restricts scripts"));
        assert!(!matcher.matches("script exited with code 1"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ExpectedError::from_spec(&ExpectedErrorSpec::pattern("[")).unwrap_err();
        assert!(matches!(err, SentinelError::Config(_)));
    }

    #[test]
    fn test_is_expected_any() {
        let matchers = vec![
            ExpectedError::Contains("ECONNREFUSED".to_string()),
            ExpectedError::Pattern(Regex::new("^fatal").unwrap()),
        ];
        assert!(is_expected(&matchers, "Network error (ECONNREFUSED): refused"));
        assert!(is_expected(&matchers, "fatal: boom"));
        assert!(!is_expected(&matchers, "not fatal"));
        assert!(!is_expected(&[], "anything"));
    }
}
