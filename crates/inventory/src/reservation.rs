//! Reservation state machine.

use common::{ItemId, Money, ReservationId};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

/// The state of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Reserved ──┬──► Completed
///            └──► Canceled
/// ```
///
/// Both `Completed` and `Canceled` are terminal. Repeating the transition
/// that produced the current terminal state is a no-op; crossing from one
/// terminal state to the other is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Stock is held for a checkout in progress.
    #[default]
    Reserved,

    /// The checkout finished and the stock is consumed (terminal state).
    Completed,

    /// The hold was released and the stock is available again (terminal state).
    Canceled,
}

impl ReservationStatus {
    /// Returns true if a reservation in this state can be completed.
    pub fn can_complete(&self) -> bool {
        matches!(self, ReservationStatus::Reserved)
    }

    /// Returns true if a reservation in this state can be released.
    pub fn can_release(&self) -> bool {
        matches!(self, ReservationStatus::Reserved)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Canceled
        )
    }

    /// Returns true if a reservation in this state counts against stock.
    pub fn holds_stock(&self) -> bool {
        !matches!(self, ReservationStatus::Canceled)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Reserved => "reserved",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A temporary hold on stock for one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub item_id: ItemId,
    pub quantity: u32,
    /// Quantity times unit price, fixed when the reservation was made.
    pub total_fee: Money,
    pub status: ReservationStatus,
}

impl Reservation {
    /// Creates a reservation in the `Reserved` state.
    pub fn new(id: ReservationId, item_id: ItemId, quantity: u32, total_fee: Money) -> Self {
        Self {
            id,
            item_id,
            quantity,
            total_fee,
            status: ReservationStatus::Reserved,
        }
    }

    /// Returns true if this reservation counts against the item's stock.
    pub fn holds_stock(&self) -> bool {
        self.status.holds_stock()
    }

    /// Marks the reservation completed.
    ///
    /// Returns `Ok(false)` if it was already completed.
    pub fn complete(&mut self) -> Result<bool> {
        match self.status {
            ReservationStatus::Completed => Ok(false),
            status if status.can_complete() => {
                self.status = ReservationStatus::Completed;
                Ok(true)
            }
            current => Err(LedgerError::InvalidTransition {
                reservation_id: self.id,
                current,
                action: "complete",
            }),
        }
    }

    /// Marks the reservation canceled, freeing its stock.
    ///
    /// Returns `Ok(false)` if it was already canceled.
    pub fn release(&mut self) -> Result<bool> {
        match self.status {
            ReservationStatus::Canceled => Ok(false),
            status if status.can_release() => {
                self.status = ReservationStatus::Canceled;
                Ok(true)
            }
            current => Err(LedgerError::InvalidTransition {
                reservation_id: self.id,
                current,
                action: "release",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation() -> Reservation {
        Reservation::new(
            ReservationId::new(1),
            ItemId::new(1),
            2,
            Money::from_cents(2000),
        )
    }

    #[test]
    fn test_default_state_is_reserved() {
        assert_eq!(ReservationStatus::default(), ReservationStatus::Reserved);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ReservationStatus::Reserved.is_terminal());
        assert!(ReservationStatus::Completed.is_terminal());
        assert!(ReservationStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_holds_stock() {
        assert!(ReservationStatus::Reserved.holds_stock());
        assert!(ReservationStatus::Completed.holds_stock());
        assert!(!ReservationStatus::Canceled.holds_stock());
    }

    #[test]
    fn test_complete_from_reserved() {
        let mut r = reservation();
        assert_eq!(r.complete(), Ok(true));
        assert_eq!(r.status, ReservationStatus::Completed);
    }

    #[test]
    fn test_repeated_transition_is_noop() {
        let mut r = reservation();
        r.release().unwrap();
        assert_eq!(r.release(), Ok(false));
        assert_eq!(r.status, ReservationStatus::Canceled);

        let mut r = reservation();
        r.complete().unwrap();
        assert_eq!(r.complete(), Ok(false));
        assert_eq!(r.status, ReservationStatus::Completed);
    }

    #[test]
    fn test_completed_cannot_be_released() {
        let mut r = reservation();
        r.complete().unwrap();

        let err = r.release().unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidTransition {
                current: ReservationStatus::Completed,
                action: "release",
                ..
            }
        ));
        assert_eq!(r.status, ReservationStatus::Completed);
    }

    #[test]
    fn test_canceled_cannot_be_completed() {
        let mut r = reservation();
        r.release().unwrap();
        assert!(r.complete().is_err());
        assert_eq!(r.status, ReservationStatus::Canceled);
    }

    #[test]
    fn test_display() {
        assert_eq!(ReservationStatus::Reserved.to_string(), "reserved");
        assert_eq!(ReservationStatus::Completed.to_string(), "completed");
        assert_eq!(ReservationStatus::Canceled.to_string(), "canceled");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ReservationStatus::Canceled).unwrap();
        assert_eq!(json, "\"canceled\"");
    }
}
