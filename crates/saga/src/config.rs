//! Checkout configuration loaded from environment variables.

use std::time::Duration;

/// Backoff parameters for retried steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after that.
    pub base_delay: Duration,
}

impl RetryConfig {
    /// Creates a retry configuration. `max_attempts` of 0 is raised to 1.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the failed attempt with zero-based index `attempt`.
    ///
    /// `base_delay * 2^attempt`, saturating instead of overflowing.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Checkout configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `CHECKOUT_TIMEOUT_SECONDS`: per-request deadline (default: `30`)
/// - `CHECKOUT_RETRY_MAX_ATTEMPTS`: attempts per retried step (default: `5`)
/// - `CHECKOUT_RETRY_BASE_DELAY_MS`: first backoff delay (default: `1000`)
/// - `REDIS_URL`: durable idempotency store; in-memory when unset
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
///
/// Unparsable or zero values fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub timeout: Duration,
    pub retry: RetryConfig,
    pub redis_url: Option<String>,
    pub log_level: String,
}

impl CheckoutConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let positive = |name: &str| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
        };
        let defaults = Self::default();

        let timeout = positive("CHECKOUT_TIMEOUT_SECONDS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let max_attempts = positive("CHECKOUT_RETRY_MAX_ATTEMPTS")
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(defaults.retry.max_attempts);
        let base_delay = lookup("CHECKOUT_RETRY_BASE_DELAY_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.base_delay);

        Self {
            timeout,
            retry: RetryConfig::new(max_attempts, base_delay),
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            redis_url: None,
            log_level: "info".to_string(),
        }
    }
}
