//! Shared types used across the checkout saga crates.

pub mod context;
pub mod money;
pub mod types;

pub use context::{Context, ContextError};
pub use money::Money;
pub use types::{IdempotencyKey, ItemId, ReservationId};
