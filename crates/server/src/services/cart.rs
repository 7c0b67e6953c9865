//! Cart ledger.
//!
//! Per-user scratch space consumed by order placement. Every call takes the
//! acting user explicitly; entry ownership is checked against it.

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use forkful_core::{CartEntryId, MenuItemId, Price};

use crate::db::{CartStore, CatalogStore, RepositoryError};
use crate::models::{CartAdjustment, CartEntry, CartLine, CurrentUser};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// A new entry needs a positive quantity, and no entry may hold more
    /// than `CartEntry::MAX_QUANTITY`.
    #[error("quantity must be between 1 and {}", CartEntry::MAX_QUANTITY)]
    InvalidQuantity,

    /// The menu item being added does not exist.
    #[error("menu item not found")]
    MenuItemNotFound,

    /// The cart entry does not exist.
    #[error("cart entry not found")]
    EntryNotFound,

    /// The cart entry belongs to another user.
    #[error("cart entry belongs to another user")]
    NotOwner,

    /// Σ(unit price × quantity) exceeds `Price::MAX`.
    #[error("cart subtotal is too large")]
    SubtotalTooLarge,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// The cart as shown to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    /// Σ(unit price × quantity) at current menu prices.
    pub subtotal: Price,
}

/// Cart ledger service.
pub struct CartService<'a, S> {
    store: &'a S,
}

impl<'a, S> CartService<'a, S>
where
    S: CartStore + CatalogStore + Sync,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add `quantity` of a menu item, or apply it as a delta to an existing entry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::MenuItemNotFound` if the item does not exist.
    /// Returns `CartError::InvalidQuantity` if there is no entry to adjust
    /// and `quantity` is not positive, or if the entry would end up above
    /// `CartEntry::MAX_QUANTITY`.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn add(
        &self,
        actor: CurrentUser,
        menu_item_id: MenuItemId,
        quantity: i32,
    ) -> Result<CartAdjustment, CartError> {
        if !(-CartEntry::MAX_QUANTITY..=CartEntry::MAX_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidQuantity);
        }
        if self.store.find_menu_item(menu_item_id).await?.is_none() {
            return Err(CartError::MenuItemNotFound);
        }

        match self
            .store
            .adjust_cart_entry(actor.user_id, menu_item_id, quantity)
            .await?
        {
            CartAdjustment::Missing | CartAdjustment::OverLimit { .. } => {
                Err(CartError::InvalidQuantity)
            }
            adjustment => Ok(adjustment),
        }
    }

    /// Overwrite an entry's quantity; a non-positive quantity removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EntryNotFound` if the entry does not exist.
    /// Returns `CartError::NotOwner` if it belongs to another user.
    /// Returns `CartError::InvalidQuantity` above `CartEntry::MAX_QUANTITY`.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn set_quantity(
        &self,
        actor: CurrentUser,
        entry_id: CartEntryId,
        quantity: i32,
    ) -> Result<(), CartError> {
        self.owned_entry(actor, entry_id).await?;
        if quantity > CartEntry::MAX_QUANTITY {
            return Err(CartError::InvalidQuantity);
        }
        if quantity <= 0 {
            self.store.delete_cart_entry(entry_id).await?;
            return Ok(());
        }
        self.store
            .set_cart_quantity(entry_id, quantity)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::EntryNotFound,
                other => CartError::Repository(other),
            })
    }

    /// Delete an entry.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EntryNotFound` if the entry does not exist.
    /// Returns `CartError::NotOwner` if it belongs to another user.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn remove(&self, actor: CurrentUser, entry_id: CartEntryId) -> Result<(), CartError> {
        self.owned_entry(actor, entry_id).await?;
        self.store.delete_cart_entry(entry_id).await?;
        Ok(())
    }

    /// The user's cart joined with live menu rows, ordered by entry ID.
    ///
    /// # Errors
    ///
    /// Returns `CartError::SubtotalTooLarge` if the subtotal exceeds
    /// `Price::MAX`.
    /// Returns `CartError::Repository` if the store fails.
    pub async fn snapshot(&self, actor: CurrentUser) -> Result<CartSnapshot, CartError> {
        let lines = self.store.cart_lines(actor.user_id).await?;
        let subtotal = lines
            .iter()
            .try_fold(Price::ZERO, |acc, line| acc.checked_add(line.line_total()?))
            .map_err(|_| CartError::SubtotalTooLarge)?;
        Ok(CartSnapshot { lines, subtotal })
    }

    async fn owned_entry(&self, actor: CurrentUser, entry_id: CartEntryId) -> Result<(), CartError> {
        let entry = self
            .store
            .find_cart_entry(entry_id)
            .await?
            .ok_or(CartError::EntryNotFound)?;
        if entry.user_id != actor.user_id {
            return Err(CartError::NotOwner);
        }
        Ok(())
    }
}
