//! Circuit breakers
//!
//! One breaker per protected dependency, looked up by name or by target URL
//! through the [`CircuitBreakerRegistry`].

mod circuit_breaker;
mod matcher;
mod registry;
mod types;

pub use circuit_breaker::CircuitBreaker;
pub use matcher::{ExpectedError, is_expected};
pub use registry::CircuitBreakerRegistry;
pub use types::{
    BreakerRoute, BreakerStats, CircuitBreakerConfig, CircuitBreakerStatus, CircuitState,
    ExpectedErrorSpec,
};

// Include tests module
#[cfg(test)]
mod tests;
