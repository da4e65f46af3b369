//! Per-scheme connection pools
//!
//! Each pool wraps one keep-alive `reqwest::Client` and a semaphore bounding
//! how many requests may be in flight through it.

use super::types::{HttpClientConfig, PoolStats};
use crate::utils::error::{Result, SentinelError};
use parking_lot::RwLock;
use reqwest::{Client, ClientBuilder};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

pub struct ConnectionPool {
    scheme: &'static str,
    client: RwLock<Option<Client>>,
    permits: RwLock<Arc<Semaphore>>,
    settings: HttpClientConfig,
    total_requests: AtomicU64,
}

impl ConnectionPool {
    pub fn new(scheme: &'static str, config: &HttpClientConfig) -> Result<Self> {
        let client = build_client(config)?;
        debug!(scheme, max_active = config.pool.max_active, "Created connection pool");

        Ok(Self {
            scheme,
            client: RwLock::new(Some(client)),
            permits: RwLock::new(Arc::new(Semaphore::new(config.pool.max_active))),
            settings: config.clone(),
            total_requests: AtomicU64::new(0),
        })
    }

    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    /// Wait for a free slot and return the client to send through
    ///
    /// The permit must be held until the response body has been read.
    pub async fn acquire(&self) -> Result<(Client, OwnedSemaphorePermit)> {
        let client = self
            .client
            .read()
            .clone()
            .ok_or_else(|| self.closed_error())?;

        let permits = Arc::clone(&self.permits.read());
        let permit = permits
            .acquire_owned()
            .await
            .map_err(|_| self.closed_error())?;

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        Ok((client, permit))
    }

    pub fn stats(&self) -> PoolStats {
        let pool = &self.settings.pool;
        let available = self.permits.read().available_permits();
        PoolStats {
            active: pool.max_active.saturating_sub(available),
            available,
            max_active: pool.max_active,
            max_idle_per_host: pool.max_idle_per_host,
            idle_timeout_ms: pool.idle_timeout.as_millis() as u64,
            total_requests: self.total_requests.load(Ordering::Relaxed),
            closed: self.is_closed(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.permits.read().is_closed()
    }

    /// Refuse new requests and release idle sockets
    pub fn shutdown(&self) {
        self.permits.read().close();
        self.client.write().take();
    }

    /// Build a fresh client and permit set after [`shutdown`](Self::shutdown)
    ///
    /// No-op while the pool is open.
    pub fn reopen(&self) -> Result<()> {
        let mut client = self.client.write();
        if client.is_some() && !self.is_closed() {
            return Ok(());
        }
        *client = Some(build_client(&self.settings)?);
        *self.permits.write() = Arc::new(Semaphore::new(self.settings.pool.max_active));
        debug!(scheme = self.scheme, "Reopened connection pool");
        Ok(())
    }

    fn closed_error(&self) -> SentinelError {
        SentinelError::Shutdown(format!("{} connection pool is closed", self.scheme))
    }
}

fn build_client(config: &HttpClientConfig) -> Result<Client> {
    let pool = &config.pool;
    let client = ClientBuilder::new()
        // Connection pool settings
        .pool_max_idle_per_host(pool.max_idle_per_host)
        .pool_idle_timeout(pool.idle_timeout)
        .tcp_keepalive(pool.keep_alive)
        .tcp_nodelay(true)
        .redirect(reqwest::redirect::Policy::none())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .user_agent(config.user_agent.as_str())
        .build()?;
    Ok(client)
}
