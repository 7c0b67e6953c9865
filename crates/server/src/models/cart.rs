//! Cart ledger types.

use serde::Serialize;

use forkful_core::{CartEntryId, MenuItemId, Price, PriceError, RestaurantId, UserId};

/// A raw cart row: one user's pending quantity of one menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartEntry {
    pub id: CartEntryId,
    pub user_id: UserId,
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
}

impl CartEntry {
    /// Largest quantity one entry may hold.
    pub const MAX_QUANTITY: i32 = 999;
}

/// A cart entry joined with its live menu row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub entry_id: CartEntryId,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: i32,
    pub restaurant_id: RestaurantId,
}

impl CartLine {
    /// `unit_price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` if the product exceeds `Price::MAX`.
    pub fn line_total(&self) -> Result<Price, PriceError> {
        self.unit_price.times(self.quantity)
    }
}

/// Outcome of applying a quantity delta to a (user, menu item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartAdjustment {
    /// No entry existed; a new one was created.
    Inserted { entry_id: CartEntryId, quantity: i32 },
    /// An existing entry's quantity changed.
    Updated { entry_id: CartEntryId, quantity: i32 },
    /// The resulting quantity was not positive, so the entry was deleted.
    Removed { entry_id: CartEntryId },
    /// No entry existed and the delta was not positive; nothing was written.
    Missing,
    /// The result would exceed [`CartEntry::MAX_QUANTITY`]; nothing was written.
    OverLimit { entry_id: CartEntryId },
}

/// The menu row a cart entry pointed at, as seen inside the checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemSnapshot {
    pub name: String,
    pub unit_price: Price,
    pub restaurant_id: RestaurantId,
}

/// A cart entry as read by checkout.
///
/// `item` is `None` when the menu row no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLine {
    pub entry_id: CartEntryId,
    pub menu_item_id: MenuItemId,
    pub quantity: i32,
    pub item: Option<MenuItemSnapshot>,
}
