//! Timeout utilities
//!
//! The loader core never times out on its own; resolvers opt in through
//! `ResolverConfig::timeout_ms`.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Execute operation with custom timeout
pub async fn with_custom_timeout<F, T>(
    operation: F,
    duration: Duration,
) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    timeout(duration, operation).await
}
