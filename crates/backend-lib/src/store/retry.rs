// ============================
// crates/backend-lib/src/store/retry.rs
// ============================
//! Bounded retry for store lookups.
//!
//! A pooled store under load can refuse connections for a moment. Lookups
//! that run on every request (session and user by id) go through
//! [`with_store_retry`], which retries transient failures with a linear
//! backoff and gives up after a fixed number of attempts.

use authgate_common::SessionWithUser;
use metrics::counter;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use super::{Store, StoreError, UserRecord};
use crate::metrics::{STORE_RETRY, STORE_RETRY_EXHAUSTED};

/// Default number of attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay unit between attempts
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry bounds for a store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_retries: u32,
    /// Wait before attempt `n + 1` is `base_delay * n`
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Upper bound of the time spent waiting across all attempts
    pub fn max_total_delay(&self) -> Duration {
        (1..self.attempts()).map(|attempt| self.delay_for(attempt)).sum()
    }

    fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }
}

/// Run `operation`, retrying transient failures.
///
/// Non-transient errors are returned straight away. When every attempt fails
/// transiently the last error is returned.
pub async fn with_store_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "store operation failed, retrying"
                );
                counter!(STORE_RETRY).increment(1);
                sleep(delay).await;
                attempt += 1;
            },
            Err(err) => {
                if err.is_transient() {
                    warn!(attempts, error = %err, "store operation failed after all retries");
                    counter!(STORE_RETRY_EXHAUSTED).increment(1);
                }
                return Err(err);
            },
        }
    }
}

/// Find a session and its owning user, retrying transient failures
pub async fn find_session_with_retry<S>(
    store: &S,
    policy: &RetryPolicy,
    session_id: &str,
) -> Result<Option<SessionWithUser>, StoreError>
where
    S: Store + ?Sized,
{
    with_store_retry(policy, || store.find_session(session_id)).await
}

/// Find a user by id, retrying transient failures
pub async fn find_user_with_retry<S>(
    store: &S,
    policy: &RetryPolicy,
    user_id: &str,
) -> Result<Option<UserRecord>, StoreError>
where
    S: Store + ?Sized,
{
    with_store_retry(policy, || store.find_user(user_id)).await
}
