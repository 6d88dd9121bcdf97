//! Checkout error types.

use common::{ContextError, IdempotencyKey, ItemId, ReservationId};
use idempotency::IdempotencyError;
use inventory::LedgerError;
use thiserror::Error;

/// Errors returned by an inventory gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    /// Not enough unreserved stock for the requested quantity.
    #[error("Insufficient stock for item {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u32,
    },

    /// The item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    /// The reservation does not exist.
    #[error("Reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// The request conflicts with the reservation's current state.
    #[error("Inventory conflict: {0}")]
    Conflict(String),

    /// The inventory service did not answer in time.
    #[error("Inventory request timed out: {0}")]
    Timeout(String),

    /// The inventory service could not be reached or failed transiently.
    #[error("Inventory network error: {0}")]
    Network(String),

    /// The request context finished before the call completed.
    #[error("Inventory request cancelled: {0}")]
    Cancelled(#[from] ContextError),
}

impl InventoryError {
    /// Returns true if repeating the call may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, InventoryError::Timeout(_) | InventoryError::Network(_))
    }
}

impl From<LedgerError> for InventoryError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                item_id,
                requested,
                available,
            } => InventoryError::InsufficientStock {
                item_id,
                requested,
                available,
            },
            LedgerError::ItemNotFound(item_id) => InventoryError::ItemNotFound(item_id),
            LedgerError::ReservationNotFound(id) => InventoryError::ReservationNotFound(id),
            other @ (LedgerError::InvalidQuantity { .. } | LedgerError::InvalidTransition { .. }) => {
                InventoryError::Conflict(other.to_string())
            }
        }
    }
}

/// Errors returned by a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// The charge was refused.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The payment service did not answer in time.
    #[error("Payment request timed out: {0}")]
    Timeout(String),

    /// The payment service could not be reached or failed transiently.
    #[error("Payment network error: {0}")]
    Network(String),

    /// The request context finished before the call completed.
    #[error("Payment request cancelled: {0}")]
    Cancelled(#[from] ContextError),
}

impl PaymentError {
    /// Returns true if repeating the call may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, PaymentError::Timeout(_) | PaymentError::Network(_))
    }
}

/// Errors that can occur while running a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request carried no idempotency key.
    #[error("Idempotency key is required")]
    MissingIdempotencyKey,

    /// The requested quantity is not positive.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    /// Another attempt with the same key is still running.
    #[error("Idempotency key is already being processed: {key}")]
    DuplicateInFlight { key: IdempotencyKey },

    /// The request was cancelled or ran past its deadline.
    #[error("Checkout cancelled: {0}")]
    Cancelled(ContextError),

    /// A non-cancellation inventory failure.
    #[error(transparent)]
    Inventory(InventoryError),

    /// A non-cancellation payment failure.
    #[error(transparent)]
    Payment(PaymentError),

    /// A step failed and releasing the reservation failed too.
    ///
    /// The stock stays held until an operator intervenes.
    #[error("Failed to release reservation {reservation_id} after {failed_step} failed: {source}")]
    CompensationFailed {
        reservation_id: ReservationId,
        failed_step: &'static str,
        #[source]
        source: InventoryError,
    },

    /// The idempotency store failed.
    #[error("Idempotency store error: {0}")]
    Idempotency(IdempotencyError),

    /// The receipt could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckoutError {
    /// Returns true if the checkout stopped because its context finished.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CheckoutError::Cancelled(_))
    }

    /// Returns true if a reservation may have been left held.
    pub fn is_compensation_failure(&self) -> bool {
        matches!(self, CheckoutError::CompensationFailed { .. })
    }
}

impl From<ContextError> for CheckoutError {
    fn from(err: ContextError) -> Self {
        CheckoutError::Cancelled(err)
    }
}

impl From<InventoryError> for CheckoutError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Cancelled(reason) => CheckoutError::Cancelled(reason),
            other => CheckoutError::Inventory(other),
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Cancelled(reason) => CheckoutError::Cancelled(reason),
            other => CheckoutError::Payment(other),
        }
    }
}

impl From<IdempotencyError> for CheckoutError {
    fn from(err: IdempotencyError) -> Self {
        match err {
            IdempotencyError::InFlight { key } => CheckoutError::DuplicateInFlight { key },
            IdempotencyError::Context(reason) => CheckoutError::Cancelled(reason),
            other => CheckoutError::Idempotency(other),
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_inventory_errors() {
        assert!(InventoryError::Timeout("slow".into()).is_retriable());
        assert!(InventoryError::Network("503".into()).is_retriable());
        assert!(!InventoryError::ItemNotFound(ItemId::new(1)).is_retriable());
        assert!(!InventoryError::Conflict("completed".into()).is_retriable());
        assert!(!InventoryError::Cancelled(ContextError::Cancelled).is_retriable());
    }

    #[test]
    fn test_retriable_payment_errors() {
        assert!(PaymentError::Network("reset".into()).is_retriable());
        assert!(!PaymentError::Declined("card".into()).is_retriable());
    }

    #[test]
    fn test_ledger_errors_map_to_gateway_errors() {
        let err: InventoryError = LedgerError::InsufficientStock {
            item_id: ItemId::new(1),
            requested: 3,
            available: 2,
        }
        .into();
        assert!(matches!(err, InventoryError::InsufficientStock { requested: 3, .. }));

        let err: InventoryError = LedgerError::InvalidQuantity { quantity: 0 }.into();
        assert!(matches!(err, InventoryError::Conflict(_)));
    }

    #[test]
    fn test_cancellation_is_lifted() {
        let err: CheckoutError = InventoryError::Cancelled(ContextError::DeadlineExceeded).into();
        assert!(err.is_cancellation());

        let err: CheckoutError = PaymentError::Cancelled(ContextError::Cancelled).into();
        assert!(err.is_cancellation());

        let err: CheckoutError = IdempotencyError::Context(ContextError::Cancelled).into();
        assert!(err.is_cancellation());
    }

    #[test]
    fn test_in_flight_maps_to_duplicate() {
        let err: CheckoutError = IdempotencyError::InFlight {
            key: IdempotencyKey::new("abc"),
        }
        .into();
        assert!(matches!(err, CheckoutError::DuplicateInFlight { .. }));
        assert_eq!(
            err.to_string(),
            "Idempotency key is already being processed: abc"
        );
    }

    #[test]
    fn test_compensation_failure_message() {
        let err = CheckoutError::CompensationFailed {
            reservation_id: ReservationId::new(5),
            failed_step: "charge_payment",
            source: InventoryError::Network("down".into()),
        };
        assert!(err.is_compensation_failure());
        assert!(!err.is_cancellation());
        assert_eq!(
            err.to_string(),
            "Failed to release reservation 5 after charge_payment failed: Inventory network error: down"
        );
    }
}
