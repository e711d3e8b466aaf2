use crate::core::error::FetchError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Attempt budget and exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

    /// A budget of zero still makes one attempt.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based): `base * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Self::DEFAULT_BASE_DELAY)
    }
}

/// Suspends between attempts. Returns `FetchError::Interrupted` when cancelled.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration) -> Result<(), FetchError>;
}

/// Creates the signal used to interrupt a [`TokioSleeper`]. Send `true` to cancel.
pub fn cancel_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

#[derive(Debug, Clone, Default)]
pub struct TokioSleeper {
    cancel: Option<watch::Receiver<bool>>,
}

impl TokioSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: watch::Receiver<bool>) -> Self {
        Self {
            cancel: Some(cancel),
        }
    }
}

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) -> Result<(), FetchError> {
        let Some(mut cancel) = self.cancel.clone() else {
            tokio::time::sleep(duration).await;
            return Ok(());
        };

        let cancelled = async move {
            // A dropped sender can never cancel
            let closed = cancel.wait_for(|cancelled| *cancelled).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = cancelled => {
                debug!("Backoff sleep cancelled");
                Err(FetchError::Interrupted)
            }
        }
    }
}

/// Runs `operation` until it succeeds, fails terminally or runs out of attempts.
///
/// `operation` receives the 1-based attempt number. Terminal failures are
/// returned as is; transient ones are retried after the policy's backoff and
/// wrapped in `ExhaustedRetries` once the budget is spent.
pub async fn with_backoff<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;
    loop {
        let failure = match operation(attempt).await {
            Ok(val) => return Ok(val),
            Err(err) => err,
        };

        if !failure.is_retryable() {
            return Err(failure);
        }

        if attempt >= max_attempts {
            return Err(FetchError::ExhaustedRetries {
                attempts: max_attempts,
                last: Box::new(failure),
            });
        }

        let delay = policy.delay_for(attempt);
        warn!(
            "Attempt {}/{} failed: {}. Retrying in {}ms...",
            attempt,
            max_attempts,
            failure,
            delay.as_millis()
        );
        sleeper.sleep(delay).await?;
        attempt += 1;
    }
}
