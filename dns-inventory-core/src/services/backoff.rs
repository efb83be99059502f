//! 限流退避执行器

use std::future::Future;
use std::time::Duration;

use dns_inventory_provider::ProviderError;
use tokio_util::sync::CancellationToken;

use crate::config::RetryPolicy;
use crate::error::{CoreError, CoreResult};

/// Retries a remote call while the remote signals throttling.
///
/// The delay starts at one base unit and doubles after every throttled
/// attempt. Any other error is returned on the first occurrence. Sleeping
/// only suspends the calling task and is interrupted by the attached
/// cancellation token.
#[derive(Debug, Clone)]
pub struct BackoffExecutor {
    max_attempts: u32,
    base_delay: Duration,
    cancel: CancellationToken,
}

impl BackoffExecutor {
    pub fn new(policy: &RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            max_attempts: policy.max_attempts.max(1),
            base_delay: policy.base_delay(),
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the `retry`-th throttled attempt (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// `Cancelled` once the token fired.
    pub fn ensure_not_cancelled(&self, operation: &str) -> CoreResult<()> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::cancelled(format!("{operation} not started")));
        }
        Ok(())
    }

    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            self.ensure_not_cancelled(operation)?;
            attempt += 1;

            let error = match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_throttled() => e,
                Err(e) => return Err(CoreError::Provider(e)),
            };

            if attempt >= self.max_attempts {
                log::error!("{operation}: throttled {attempt} times, giving up");
                return Err(CoreError::Exhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.delay_for(attempt - 1);
            log::warn!(
                "{operation}: throttled (attempt {attempt}/{}), retrying in {delay:?}",
                self.max_attempts
            );
            tokio::select! {
                () = self.cancel.cancelled() => {
                    return Err(CoreError::cancelled(format!("{operation} cancelled while backing off")));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
