//! Inventory gateway trait and ledger-backed implementation.

use async_trait::async_trait;
use common::{Context, ItemId, Money, ReservationId};
use inventory::ReservationLedger;
use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// What the checkout keeps from a successful reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationTicket {
    /// The reservation ID assigned by the inventory service.
    pub reservation_id: ReservationId,
    /// Amount to charge, fixed when the stock was reserved.
    pub total_fee: Money,
}

/// Trait for inventory reservation operations.
#[async_trait]
pub trait InventoryGateway: Send + Sync {
    /// Holds `quantity` units of an item.
    async fn reserve(
        &self,
        ctx: &Context,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<ReservationTicket, InventoryError>;

    /// Cancels a reservation, returning its stock.
    async fn release(&self, ctx: &Context, reservation_id: ReservationId)
    -> Result<(), InventoryError>;

    /// Finalizes a reservation.
    async fn complete(
        &self,
        ctx: &Context,
        reservation_id: ReservationId,
    ) -> Result<(), InventoryError>;
}

/// Inventory gateway that talks to an in-process [`ReservationLedger`].
#[derive(Debug, Clone, Default)]
pub struct LedgerInventoryGateway {
    ledger: ReservationLedger,
}

impl LedgerInventoryGateway {
    /// Creates a gateway over the given ledger.
    pub fn new(ledger: ReservationLedger) -> Self {
        Self { ledger }
    }

    /// Returns the underlying ledger.
    pub fn ledger(&self) -> &ReservationLedger {
        &self.ledger
    }
}

#[async_trait]
impl InventoryGateway for LedgerInventoryGateway {
    async fn reserve(
        &self,
        ctx: &Context,
        item_id: ItemId,
        quantity: u32,
    ) -> Result<ReservationTicket, InventoryError> {
        ctx.check()?;
        let reservation = self.ledger.reserve(item_id, quantity).await?;
        Ok(ReservationTicket {
            reservation_id: reservation.id,
            total_fee: reservation.total_fee,
        })
    }

    async fn release(
        &self,
        ctx: &Context,
        reservation_id: ReservationId,
    ) -> Result<(), InventoryError> {
        ctx.check()?;
        Ok(self.ledger.release(reservation_id).await?)
    }

    async fn complete(
        &self,
        ctx: &Context,
        reservation_id: ReservationId,
    ) -> Result<(), InventoryError> {
        ctx.check()?;
        Ok(self.ledger.complete(reservation_id).await?)
    }
}
