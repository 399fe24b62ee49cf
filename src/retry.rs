//! Retry utilities with exponential backoff and jitter.
//!
//! Used by the create-or-update primitive to absorb optimistic-concurrency
//! conflicts: the whole fetch-mutate-write cycle is re-run against the
//! freshest copy of the resource until it lands or attempts run out.
//!
//! # Example
//!
//! ```ignore
//! use ocs_deployer::retry::{retry_with_backoff_if, RetryConfig};
//!
//! let result = retry_with_backoff_if(
//!     &RetryConfig::conflict(),
//!     "update StorageCluster",
//!     &cancel,
//!     || async { store.update_storage_cluster(&sc).await },
//!     |e: &Error| e.is_conflict(),
//! ).await?;
//! ```

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Configuration for operations that may fail transiently.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Short, bounded retry for resourceVersion conflicts
    ///
    /// Conflicts resolve as soon as we re-read the object, so the delays are
    /// small and the attempt count is capped.
    pub fn conflict() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

/// Execute an async operation with exponential backoff and jitter, retrying
/// only errors accepted by `should_retry`.
///
/// Returns the first success, the first error rejected by `should_retry`, or
/// the last error once `max_attempts` is exhausted. If `cancel` fires while
/// waiting between attempts, the wait is abandoned and the last error is
/// returned.
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationToken,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt = attempt.saturating_add(1);

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => {
                if attempt >= config.max_attempts {
                    error!(
                        operation = %operation_name,
                        attempt = attempt,
                        error = %e,
                        "Operation failed after max retries"
                    );
                    return Err(e);
                }

                // Add jitter: 0.5x to 1.5x of the delay
                let jitter = rand::thread_rng().gen_range(0.5..1.5);
                let jittered_delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);

                warn!(
                    operation = %operation_name,
                    attempt = attempt,
                    error = %e,
                    delay_ms = jittered_delay.as_millis(),
                    "Operation failed, retrying"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(
                            operation = %operation_name,
                            attempt = attempt,
                            "Retry abandoned, cancelled during backoff"
                        );
                        return Err(e);
                    }
                    _ = tokio::time::sleep(jittered_delay) => {}
                }

                // Exponential backoff, capped at max_delay
                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
