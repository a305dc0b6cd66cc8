//! Retry combinator for operations that fail with a transient error class
//!
//! Store transactions can abort when another writer touches the same rows.
//! Those aborts are retried here; anything else is handed straight back.

use std::future::Future;
use std::time::Duration;

/// How often, and how patiently, an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, `None` for no limit
    pub max_attempts: Option<u32>,
    /// Delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Some(3),
            backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    /// Retries until the operation succeeds or fails with a non-retryable error
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            ..Default::default()
        }
    }

    /// Gives up after `max_attempts` attempts.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Default::default()
        }
    }

    /// Set backoff delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns true if another attempt may follow attempt number `attempt`
    pub fn allows_another(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Runs `op` until it succeeds, fails with an error `is_retryable` rejects, or
/// the policy runs out of attempts
///
/// # Arguments
///
/// * `policy` - Attempt limit and backoff
/// * `is_retryable` - Classifies an error as transient
/// * `op` - Produces a fresh future for every attempt
///
/// # Returns
///
/// The first success, or the last error seen
pub async fn retry<T, E, F, Fut, C>(policy: RetryPolicy, is_retryable: C, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) && policy.allows_another(attempt) => {
                tracing::trace!(attempt, "Transient failure, retrying");
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
}
