use std::{future::Future, time::Duration};

use tracing::warn;

use crate::UploadError;

/// Bounded retry with linear backoff. Each attempt is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    /// Runs `f` until it succeeds, fails with a non-transient error or the
    /// attempts run out. A timeout counts as a transient failure.
    pub async fn run<T, F, Fut>(&self, op: &'static str, mut f: F) -> Result<T, UploadError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UploadError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            let res = match tokio::time::timeout(self.timeout, f()).await {
                Ok(r) => r,
                Err(_) => Err(UploadError::Timeout(op)),
            };

            match res {
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.delay(attempt);
                    warn!(op, attempt, ?delay, error = %e, "operation failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                r => return r,
            }
        }
    }
}
