//! Ledger error types.

use common::{ItemId, ReservationId};
use thiserror::Error;

use crate::reservation::ReservationStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The item does not exist in the ledger.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The reservation does not exist in the ledger.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Not enough unreserved stock to satisfy the request.
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// Requested quantity is not positive.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// The reservation is already in a terminal state that forbids the action.
    #[error("Invalid transition: cannot {action} reservation {reservation_id} in {current} state")]
    InvalidTransition {
        reservation_id: ReservationId,
        current: ReservationStatus,
        action: &'static str,
    },
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;
