//! Collaborator traits for checkout steps and their in-process implementations.

pub mod inventory;
pub mod payment;

pub use inventory::{InventoryGateway, LedgerInventoryGateway, ReservationTicket};
pub use payment::{InMemoryPaymentGateway, PaymentGateway, PaymentResult};
