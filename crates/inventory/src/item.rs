use common::{ItemId, Money};
use serde::{Deserialize, Serialize};

use crate::reservation::Reservation;

/// A stocked item as configured in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    /// Price per unit.
    pub unit_price: Money,
    /// Stock the item started with. Never decremented.
    pub initial_stock: u32,
}

impl Item {
    /// Creates a new item.
    pub fn new(id: ItemId, unit_price: Money, initial_stock: u32) -> Self {
        Self {
            id,
            unit_price,
            initial_stock,
        }
    }

    /// Computes available stock given the reservations made against this item.
    ///
    /// Reservations for other items are ignored.
    pub fn available_stock<'a>(&self, reservations: impl IntoIterator<Item = &'a Reservation>) -> u32 {
        let held: u64 = reservations
            .into_iter()
            .filter(|r| r.item_id == self.id && r.holds_stock())
            .map(|r| u64::from(r.quantity))
            .sum();
        u64::from(self.initial_stock)
            .saturating_sub(held)
            .try_into()
            .unwrap_or(0)
    }
}

/// An item together with every reservation made against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item: Item,
    pub reservations: Vec<Reservation>,
}

impl ItemSnapshot {
    /// Returns the stock that can still be reserved.
    pub fn available_stock(&self) -> u32 {
        self.item.available_stock(&self.reservations)
    }
}
