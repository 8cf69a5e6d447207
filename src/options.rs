use std::time::Duration;

use serde::Deserialize;

use crate::{Result, ServiceError};

/// Configures timeout, retry and concurrency behavior.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Ceiling on attempts in flight at once, per client.
    pub max_concurrent_requests: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 300,
            request_timeout_ms: 5_000,
            max_concurrent_requests: 5,
        }
    }
}

impl RetryPolicy {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Upper bound on network attempts for one logical request.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Connection pool settings for the shared transport.
///
/// Per-host limits scale with the concurrency ceiling so the limiter, not the
/// pool, is what throttles throughput.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct PoolOptions {
    /// TCP connect timeout in milliseconds. Covers the TLS handshake too.
    pub connect_timeout_ms: u64,
    /// TCP keep-alive probe interval in milliseconds.
    pub tcp_keepalive_ms: u64,
    /// How long an idle pooled connection is kept, in milliseconds.
    pub idle_timeout_ms: u64,
    pub max_idle_per_host: usize,
    pub max_connections_per_host: usize,
}

impl PoolOptions {
    pub fn sized_for(max_concurrent_requests: usize) -> Self {
        Self {
            connect_timeout_ms: 3_000,
            tcp_keepalive_ms: 30_000,
            idle_timeout_ms: 90_000,
            max_idle_per_host: max_concurrent_requests.saturating_mul(2),
            max_connections_per_host: max_concurrent_requests.saturating_mul(3),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_millis(self.tcp_keepalive_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::sized_for(RetryPolicy::default().max_concurrent_requests)
    }
}

/// Client options: retry policy plus pool sizing.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    pub retry: RetryPolicy,
    pub pool: PoolOptions,
}

impl ClientOptions {
    /// Options with the given policy and a pool sized to its concurrency ceiling.
    pub fn from_policy(retry: RetryPolicy) -> Self {
        let pool = PoolOptions::sized_for(retry.max_concurrent_requests);
        Self { retry, pool }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retry.max_concurrent_requests == 0 {
            return Err(ServiceError::Config(
                "max_concurrent_requests must be at least 1".to_owned(),
            ));
        }
        if self.retry.request_timeout_ms == 0 {
            return Err(ServiceError::Config(
                "request_timeout_ms must be greater than zero".to_owned(),
            ));
        }
        if self.pool.max_connections_per_host < self.retry.max_concurrent_requests {
            return Err(ServiceError::Config(format!(
                "max_connections_per_host ({}) is below max_concurrent_requests ({})",
                self.pool.max_connections_per_host, self.retry.max_concurrent_requests
            )));
        }
        Ok(())
    }
}
