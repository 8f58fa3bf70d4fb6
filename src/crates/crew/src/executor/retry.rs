//! Bounded retry for LLM calls
//!
//! Delays grow by `multiplier` per attempt and are capped at `max_delay`.
//! A multiplier of 1.0 gives the fixed delay used for model calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor per retry (1.0 = fixed delay)
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::fixed(2, Duration::from_secs(2))
    }
}

impl RetryConfig {
    pub fn new(max_retries: usize, initial_delay: Duration, max_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            multiplier,
        }
    }

    /// Same delay before every retry.
    pub fn fixed(max_retries: usize, delay: Duration) -> Self {
        Self::new(max_retries, delay, delay, 1.0)
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Total attempts including the first.
    pub fn attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Delay before retry number `attempt + 1` (0-indexed)
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::from_secs_f64(capped)
    }
}

/// Last error of a retry loop and how many attempts were made.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub error: E,
    pub attempts: usize,
}

/// Run `operation` until it succeeds, the retries are used up, or it fails
/// with an error `should_retry` rejects.
pub async fn with_retry_when<F, Fut, T, E, P>(
    config: &RetryConfig,
    context_id: &str,
    mut operation: F,
    should_retry: P,
) -> std::result::Result<T, Exhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = config.calculate_delay(attempt - 1);
            debug!(
                context_id = %context_id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Retrying after delay"
            );
            sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(context_id = %context_id, attempt = attempt, "Retry succeeded");
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= config.max_retries || !should_retry(&e) {
                    warn!(
                        context_id = %context_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Operation failed, giving up"
                    );
                    return Err(Exhausted {
                        error: e,
                        attempts: attempt + 1,
                    });
                }
                warn!(
                    context_id = %context_id,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    error = %e,
                    "Operation failed, will retry"
                );
            }
        }
        attempt += 1;
    }
}
