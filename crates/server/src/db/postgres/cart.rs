//! Cart ledger.

use rust_decimal::Decimal;
use sqlx::FromRow;

use forkful_core::{CartEntryId, MenuItemId, Price, RestaurantId, UserId};

use super::{PgStore, corrupt};
use crate::db::{CartStore, RepositoryError};
use crate::models::{CartAdjustment, CartEntry, CartLine};

#[derive(Debug, FromRow)]
struct CartEntryRow {
    id: CartEntryId,
    user_id: UserId,
    menu_item_id: MenuItemId,
    quantity: i32,
}

impl From<CartEntryRow> for CartEntry {
    fn from(row: CartEntryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            menu_item_id: row.menu_item_id,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, FromRow)]
struct CartLineRow {
    entry_id: CartEntryId,
    menu_item_id: MenuItemId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    restaurant_id: RestaurantId,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            entry_id: row.entry_id,
            menu_item_id: row.menu_item_id,
            name: row.name,
            unit_price: Price::new(row.unit_price).map_err(|e| corrupt("menu price", e))?,
            quantity: row.quantity,
            restaurant_id: row.restaurant_id,
        })
    }
}

impl CartStore for PgStore {
    async fn adjust_cart_entry(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
        delta: i32,
    ) -> Result<CartAdjustment, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(CartEntryId, i32)> = sqlx::query_as(
            "SELECT id, quantity FROM cart_entry
             WHERE user_id = $1 AND menu_item_id = $2
             FOR UPDATE",
        )
        .bind(user_id)
        .bind(menu_item_id)
        .fetch_optional(&mut *tx)
        .await?;

        let adjustment = match existing {
            Some((entry_id, current)) => {
                let quantity = current.saturating_add(delta);
                if quantity > CartEntry::MAX_QUANTITY {
                    return Ok(CartAdjustment::OverLimit { entry_id });
                }
                if quantity <= 0 {
                    sqlx::query("DELETE FROM cart_entry WHERE id = $1")
                        .bind(entry_id)
                        .execute(&mut *tx)
                        .await?;
                    CartAdjustment::Removed { entry_id }
                } else {
                    sqlx::query("UPDATE cart_entry SET quantity = $2 WHERE id = $1")
                        .bind(entry_id)
                        .bind(quantity)
                        .execute(&mut *tx)
                        .await?;
                    CartAdjustment::Updated { entry_id, quantity }
                }
            }
            None if delta > 0 => {
                // A concurrent insert for the same pair folds into an increment,
                // unless that would pass the cap.
                let row: Option<(CartEntryId, i32)> = sqlx::query_as(
                    "INSERT INTO cart_entry (user_id, menu_item_id, quantity)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (user_id, menu_item_id)
                     DO UPDATE SET quantity = cart_entry.quantity + EXCLUDED.quantity
                     WHERE cart_entry.quantity + EXCLUDED.quantity <= $4
                     RETURNING id, quantity",
                )
                .bind(user_id)
                .bind(menu_item_id)
                .bind(delta)
                .bind(CartEntry::MAX_QUANTITY)
                .fetch_optional(&mut *tx)
                .await?;
                match row {
                    Some((entry_id, quantity)) if quantity == delta => {
                        CartAdjustment::Inserted { entry_id, quantity }
                    }
                    Some((entry_id, quantity)) => CartAdjustment::Updated { entry_id, quantity },
                    None => {
                        let (entry_id,): (CartEntryId,) = sqlx::query_as(
                            "SELECT id FROM cart_entry WHERE user_id = $1 AND menu_item_id = $2",
                        )
                        .bind(user_id)
                        .bind(menu_item_id)
                        .fetch_one(&mut *tx)
                        .await?;
                        CartAdjustment::OverLimit { entry_id }
                    }
                }
            }
            None => CartAdjustment::Missing,
        };

        tx.commit().await?;
        Ok(adjustment)
    }

    async fn find_cart_entry(&self, id: CartEntryId) -> Result<Option<CartEntry>, RepositoryError> {
        let row: Option<CartEntryRow> = sqlx::query_as(
            "SELECT id, user_id, menu_item_id, quantity FROM cart_entry WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CartEntry::from))
    }

    async fn set_cart_quantity(&self, id: CartEntryId, quantity: i32) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cart_entry SET quantity = $2 WHERE id = $1")
            .bind(id)
            .bind(quantity)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_cart_entry(&self, id: CartEntryId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_entry WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn cart_lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(
            "SELECT c.id AS entry_id, c.menu_item_id, m.name, m.price AS unit_price,
                    c.quantity, m.restaurant_id
             FROM cart_entry c
             JOIN menu_item m ON m.id = c.menu_item_id
             WHERE c.user_id = $1
             ORDER BY c.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CartLine::try_from).collect()
    }
}
