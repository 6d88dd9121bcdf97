//! Checkout saga with retries, compensation and idempotent replay.
//!
//! The checkout saga follows these steps:
//! 1. Reserve inventory (retried with exponential backoff)
//! 2. Charge payment (not retried; the payment side deduplicates by key)
//! 3. Complete the reservation (retried)
//!
//! If charging or completing fails, the reservation is released. Every
//! request carries an idempotency key, so a retried request replays the
//! first outcome instead of repeating side effects.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod request;
pub mod retry;
pub mod services;
pub mod sleeper;
pub mod steps;
pub mod telemetry;

pub use config::{CheckoutConfig, RetryConfig};
pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, InventoryError, PaymentError, Result};
pub use request::{CheckoutReceipt, CheckoutRequest};
pub use retry::{RetryPolicy, Retryable};
pub use services::{
    InMemoryPaymentGateway, InventoryGateway, LedgerInventoryGateway, PaymentGateway,
    PaymentResult, ReservationTicket,
};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
