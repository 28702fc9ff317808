use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::StageResult;

/// Exponential backoff for retryable failures: attempt `n` (0-based) waits
/// `base_delay_ms * 2^n`, capped at `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 250,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2_u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are exhausted. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> StageResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StageResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        label,
                        attempt + 1,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
