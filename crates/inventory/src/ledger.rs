//! In-memory reservation ledger.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use common::{ItemId, ReservationId};
use tokio::sync::RwLock;

use crate::error::{LedgerError, Result};
use crate::item::{Item, ItemSnapshot};
use crate::reservation::Reservation;

#[derive(Debug, Default)]
struct LedgerState {
    items: HashMap<ItemId, Item>,
    reservations: BTreeMap<ReservationId, Reservation>,
    last_id: u64,
}

impl LedgerState {
    fn item(&self, item_id: ItemId) -> Result<&Item> {
        self.items
            .get(&item_id)
            .ok_or(LedgerError::ItemNotFound(item_id))
    }

    fn available_stock(&self, item: &Item) -> u32 {
        item.available_stock(self.reservations.values())
    }

    fn reservation_mut(&mut self, reservation_id: ReservationId) -> Result<&mut Reservation> {
        self.reservations
            .get_mut(&reservation_id)
            .ok_or(LedgerError::ReservationNotFound(reservation_id))
    }
}

/// Owns items and reservations and enforces the reservation state machine.
///
/// The availability check and the insertion of a new reservation happen
/// under one write lock, so concurrent reservations can never oversell an
/// item. Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct ReservationLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl ReservationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger stocked with the given items.
    pub fn with_items(items: impl IntoIterator<Item = Item>) -> Self {
        let state = LedgerState {
            items: items.into_iter().map(|item| (item.id, item)).collect(),
            ..LedgerState::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Adds an item, replacing any previous definition with the same ID.
    pub async fn add_item(&self, item: Item) {
        self.state.write().await.items.insert(item.id, item);
    }

    /// Loads an item together with all of its reservations.
    pub async fn get_item(&self, item_id: ItemId) -> Result<ItemSnapshot> {
        let state = self.state.read().await;
        let item = state.item(item_id)?.clone();
        let reservations = state
            .reservations
            .values()
            .filter(|r| r.item_id == item_id)
            .cloned()
            .collect();
        Ok(ItemSnapshot { item, reservations })
    }

    /// Returns the stock of an item that can still be reserved.
    pub async fn available_stock(&self, item_id: ItemId) -> Result<u32> {
        let state = self.state.read().await;
        let item = state.item(item_id)?;
        Ok(state.available_stock(item))
    }

    /// Looks up a single reservation.
    pub async fn reservation(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.state
            .read()
            .await
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or(LedgerError::ReservationNotFound(reservation_id))
    }

    /// Reserves `quantity` units of an item.
    ///
    /// The fee is fixed here as `quantity * unit_price`.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, item_id: ItemId, quantity: u32) -> Result<Reservation> {
        if quantity == 0 {
            return Err(LedgerError::InvalidQuantity { quantity });
        }

        let mut state = self.state.write().await;
        let item = state.item(item_id)?;
        let available = state.available_stock(item);
        if quantity > available {
            tracing::debug!(%item_id, quantity, available, "insufficient stock");
            return Err(LedgerError::InsufficientStock {
                item_id,
                requested: quantity,
                available,
            });
        }
        let total_fee = item.unit_price.multiply(quantity);

        state.last_id += 1;
        let reservation = Reservation::new(
            ReservationId::new(state.last_id),
            item_id,
            quantity,
            total_fee,
        );
        state
            .reservations
            .insert(reservation.id, reservation.clone());

        tracing::info!(reservation_id = %reservation.id, %total_fee, "stock reserved");
        Ok(reservation)
    }

    /// Cancels a reservation, returning its quantity to available stock.
    ///
    /// Releasing an already canceled reservation is a no-op. Releasing a
    /// completed reservation fails with [`LedgerError::InvalidTransition`].
    #[tracing::instrument(skip(self))]
    pub async fn release(&self, reservation_id: ReservationId) -> Result<()> {
        let mut state = self.state.write().await;
        let changed = state.reservation_mut(reservation_id)?.release()?;
        if changed {
            tracing::info!("reservation released");
        } else {
            tracing::debug!("reservation already released");
        }
        Ok(())
    }

    /// Marks a reservation completed. Available stock does not change.
    ///
    /// Completing an already completed reservation is a no-op. Completing a
    /// canceled reservation fails with [`LedgerError::InvalidTransition`].
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, reservation_id: ReservationId) -> Result<()> {
        let mut state = self.state.write().await;
        let changed = state.reservation_mut(reservation_id)?.complete()?;
        if changed {
            tracing::info!("reservation completed");
        } else {
            tracing::debug!("reservation already completed");
        }
        Ok(())
    }
}
