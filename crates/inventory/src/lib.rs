//! Inventory reservation ledger.
//!
//! The ledger is the single owner of stock state. Items carry their initial
//! stock only; availability is always derived from the reservation set:
//!
//! ```text
//! available = initial_stock - sum(quantity of reservations not Canceled)
//! ```
//!
//! so releasing a reservation frees its stock without a separate restock
//! step, and no counter can drift from the reservations it summarizes.

pub mod error;
pub mod item;
pub mod ledger;
pub mod reservation;

pub use error::{LedgerError, Result};
pub use item::{Item, ItemSnapshot};
pub use ledger::ReservationLedger;
pub use reservation::{Reservation, ReservationStatus};
