//! Checkout input and output.

use common::{IdempotencyKey, ItemId, Money, ReservationId};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// A request to buy `quantity` units of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub item_id: ItemId,
    pub quantity: u32,
    /// Client-chosen token; retries of the same purchase reuse it.
    pub idempotency_key: IdempotencyKey,
}

impl CheckoutRequest {
    /// Creates a new checkout request.
    pub fn new(item_id: ItemId, quantity: u32, idempotency_key: impl Into<IdempotencyKey>) -> Self {
        Self {
            item_id,
            quantity,
            idempotency_key: idempotency_key.into(),
        }
    }

    /// Rejects requests that can never succeed.
    pub fn validate(&self) -> Result<()> {
        if self.idempotency_key.is_blank() {
            return Err(CheckoutError::MissingIdempotencyKey);
        }
        if self.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity {
                quantity: self.quantity,
            });
        }
        Ok(())
    }
}

/// The result of a completed checkout. Cached for replay under the
/// request's idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    pub reservation_id: ReservationId,
    pub item_id: ItemId,
    pub quantity: u32,
    pub total_fee: Money,
}
