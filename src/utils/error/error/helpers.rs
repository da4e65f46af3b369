//! Helper functions for creating and inspecting errors

use super::types::{NetworkErrorCode, SentinelError};

impl SentinelError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn check_failed<S: Into<String>>(message: S) -> Self {
        Self::CheckFailed(message.into())
    }

    pub fn command<S: Into<String>>(message: S) -> Self {
        Self::Command(message.into())
    }

    pub fn unsupported<S: Into<String>>(message: S) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    pub fn network<S: Into<String>>(code: NetworkErrorCode, message: S) -> Self {
        Self::Network {
            code,
            message: message.into(),
        }
    }

    /// True when the error is a fail-fast rejection from an open circuit
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Transport error code, when the error came from the network layer
    pub fn network_code(&self) -> Option<NetworkErrorCode> {
        match self {
            Self::Network { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// HTTP status an API layer should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Config(_) | Self::Unsupported(_) => 400,
            Self::CircuitOpen { .. } | Self::Shutdown(_) => 503,
            Self::Timeout(_) => 504,
            Self::Network { .. } | Self::HttpStatus { .. } => 502,
            _ => 500,
        }
    }
}
