//! Service check abstraction

use super::types::CheckOutcome;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// One check of a service
///
/// Returning an error marks the service unhealthy with the error's message.
#[async_trait]
pub trait ServiceCheck: Send + Sync {
    async fn check(&self, correlation_id: &str) -> Result<CheckOutcome>;
}

type CheckFuture = Pin<Box<dyn Future<Output = Result<CheckOutcome>> + Send>>;

/// Adapts a closure into a [`ServiceCheck`]
pub struct FnCheck {
    func: Box<dyn Fn(String) -> CheckFuture + Send + Sync>,
}

impl FnCheck {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CheckOutcome>> + Send + 'static,
    {
        Self {
            func: Box::new(move |correlation_id| Box::pin(func(correlation_id))),
        }
    }
}

#[async_trait]
impl ServiceCheck for FnCheck {
    async fn check(&self, correlation_id: &str) -> Result<CheckOutcome> {
        (self.func)(correlation_id.to_string()).await
    }
}
