//! Tracing subscriber setup for the checkout binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::CheckoutConfig;

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` wins when it parses; otherwise the configured level is used.
/// Does nothing if a global subscriber is already installed.
pub fn init(config: &CheckoutConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
