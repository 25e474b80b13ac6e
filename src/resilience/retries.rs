//! Retry logic.
//!
//! # Responsibilities
//! - Bound the number of attempts per delivery
//! - Wait a fixed delay between attempts
//! - Report how many attempts were spent
//!
//! # Design Decisions
//! - At least one attempt, always
//! - No wait after the final attempt
//! - Every failure is retryable; the caller decides what counts as failure

use std::future::Future;
use std::time::Duration;

use crate::config::DispatchConfig;

/// Fixed-delay attempt budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    tries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `tries` below one is raised to one.
    pub fn new(tries: u32, delay: Duration) -> Self {
        Self {
            tries: tries.max(1),
            delay,
        }
    }

    pub fn tries(&self) -> u32 {
        self.tries
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `attempt` until it succeeds or the budget is spent.
    ///
    /// `attempt` receives the 1-based attempt number. Returns the number of
    /// attempts used on success, or that number and the last error.
    pub async fn run<F, Fut, E>(&self, mut attempt: F) -> Result<u32, (u32, E)>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: std::fmt::Display,
    {
        let mut n = 0;
        loop {
            n += 1;
            match attempt(n).await {
                Ok(()) => return Ok(n),
                Err(e) if n >= self.tries => return Err((n, e)),
                Err(e) => {
                    tracing::warn!(
                        attempt = n,
                        tries = self.tries,
                        delay = ?self.delay,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

impl From<&DispatchConfig> for RetryPolicy {
    fn from(config: &DispatchConfig) -> Self {
        RetryPolicy::new(config.tries, Duration::from_secs(config.delay_secs))
    }
}
