//! Retry Wrapper
//!
//! Generic retry-with-backoff around a single remote model call. Retries
//! only transient errors (rate limits, network failures, server errors,
//! overload signals); everything else propagates on the first attempt.
//! Conversation state is never touched here, so a retried call replays the
//! exact same request.

use std::future::Future;
use std::time::Duration;

use super::types::{LlmError, LlmResult};

/// Retry discipline for one remote call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before attempt n+1 is `base_delay * n` (linear scaling). A
    /// provider-suggested retry-after acts as a floor on the wait.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32, error: &LlmError) -> Duration {
        let scaled = self.base_delay * attempt;
        match error.retry_after_secs() {
            Some(secs) => scaled.max(Duration::from_secs(secs)),
            None => scaled,
        }
    }
}

/// Run `call`, retrying transient failures per `policy`.
///
/// Exhausting all attempts on a transient error yields
/// [`LlmError::RetriesExhausted`] wrapping the last underlying error.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut call: F) -> LlmResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = LlmResult<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let wait = policy.delay_for(attempt, &e);
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts = attempts,
                    wait_secs = wait.as_secs(),
                    "retrying model call"
                );
                tokio::time::sleep(wait).await;
                last_err = Some(e);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                last_err = Some(e);
                break;
            }
        }
    }

    let last = last_err.unwrap_or(LlmError::Other {
        message: "retry loop ended without an error".to_string(),
    });
    Err(LlmError::RetriesExhausted {
        attempts,
        last: Box::new(last),
    })
}
