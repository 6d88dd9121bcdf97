//! Bounded exponential-backoff retries that respect the request context.

use std::future::Future;
use std::sync::Arc;

use common::{Context, ContextError};

use crate::config::RetryConfig;
use crate::error::InventoryError;
use crate::sleeper::{Sleeper, TokioSleeper};

/// An error that knows whether repeating the failed call may help.
///
/// `From<ContextError>` lets the policy report a finished context in the
/// operation's own error type.
pub trait Retryable: From<ContextError> + std::fmt::Display {
    fn is_retriable(&self) -> bool;
}

impl Retryable for InventoryError {
    fn is_retriable(&self) -> bool {
        InventoryError::is_retriable(self)
    }
}

/// Runs an operation up to `max_attempts` times.
///
/// After the failed attempt with zero-based index `i` the policy waits
/// `base_delay * 2^i`. There is no wait after the final attempt. The context
/// is checked before every attempt and before every wait, and a wait ends
/// early when the context finishes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    /// Creates a policy that sleeps on the tokio timer.
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the sleeper, e.g. with an instant one in tests.
    #[must_use]
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Returns the backoff parameters.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `operation` until it succeeds, fails with a non-retriable error,
    /// exhausts its attempts, or the context finishes.
    ///
    /// `step` labels logs and metrics.
    pub async fn run<T, E, F, Fut>(
        &self,
        ctx: &Context,
        step: &'static str,
        mut operation: F,
    ) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt: u32 = 0;
        loop {
            ctx.check()?;

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retriable() {
                tracing::debug!(step, attempt = attempt + 1, error = %err, "non-retriable failure");
                return Err(err);
            }
            if attempt + 1 >= self.config.max_attempts {
                tracing::warn!(step, attempts = attempt + 1, error = %err, "retries exhausted");
                return Err(err);
            }

            let delay = self.config.delay_for_attempt(attempt);
            tracing::warn!(
                step,
                attempt = attempt + 1,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "step failed, retrying"
            );
            metrics::counter!("checkout_retries_total", "step" => step).increment(1);

            ctx.check()?;
            tokio::select! {
                reason = ctx.done() => return Err(reason.into()),
                () = self.sleeper.sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
