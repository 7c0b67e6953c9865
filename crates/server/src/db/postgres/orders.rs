//! Orders, line items, promo codes and the checkout transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;

use forkful_core::{
    CartEntryId, DiscountPercent, MenuItemId, OrderId, OrderLineItemId, OrderStatus, Price,
    RestaurantId, UserId,
};

use super::{PgStore, corrupt};
use crate::db::{OrderStore, RepositoryError};
use crate::models::{
    CheckoutLine, MenuItemSnapshot, Order, OrderDraft, OrderLineItem, Page, PromoCode,
};

const ORDER_COLUMNS: &str =
    "id, user_id, restaurant_id, total_price, delivery_address, status, created_at";

#[derive(Debug, FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    restaurant_id: RestaurantId,
    total_price: Decimal,
    delivery_address: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: OrderLineItemId,
    order_id: OrderId,
    menu_item_id: MenuItemId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl TryFrom<LineItemRow> for OrderLineItem {
    type Error = RepositoryError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            menu_item_id: row.menu_item_id,
            name: row.name,
            unit_price: Price::new(row.unit_price).map_err(|e| corrupt("unit price", e))?,
            quantity: row.quantity,
        })
    }
}

fn assemble(row: OrderRow, items: Vec<OrderLineItem>) -> Result<Order, RepositoryError> {
    Ok(Order {
        id: row.id,
        user_id: row.user_id,
        restaurant_id: row.restaurant_id,
        total_price: Price::new(row.total_price).map_err(|e| corrupt("order total", e))?,
        delivery_address: row.delivery_address,
        status: row.status,
        created_at: row.created_at,
        items,
    })
}

/// Cart row left-joined with its menu row; menu columns are NULL when the item is gone.
#[derive(Debug, FromRow)]
struct CheckoutRow {
    entry_id: CartEntryId,
    menu_item_id: MenuItemId,
    quantity: i32,
    name: Option<String>,
    unit_price: Option<Decimal>,
    restaurant_id: Option<RestaurantId>,
}

impl TryFrom<CheckoutRow> for CheckoutLine {
    type Error = RepositoryError;

    fn try_from(row: CheckoutRow) -> Result<Self, Self::Error> {
        let item = match (row.name, row.unit_price, row.restaurant_id) {
            (Some(name), Some(price), Some(restaurant_id)) => Some(MenuItemSnapshot {
                name,
                unit_price: Price::new(price).map_err(|e| corrupt("menu price", e))?,
                restaurant_id,
            }),
            _ => None,
        };
        Ok(Self {
            entry_id: row.entry_id,
            menu_item_id: row.menu_item_id,
            quantity: row.quantity,
            item,
        })
    }
}

#[derive(Debug, FromRow)]
struct PromoRow {
    code: String,
    discount: Decimal,
    valid_until: DateTime<Utc>,
}

impl TryFrom<PromoRow> for PromoCode {
    type Error = RepositoryError;

    fn try_from(row: PromoRow) -> Result<Self, Self::Error> {
        Ok(Self {
            code: row.code,
            discount: DiscountPercent::new(row.discount).map_err(|e| corrupt("discount", e))?,
            valid_until: row.valid_until,
        })
    }
}

impl PgStore {
    /// Load line items for `rows` in one query and assemble the aggregates.
    async fn with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id.as_i32()).collect();

        let item_rows: Vec<LineItemRow> = sqlx::query_as(
            "SELECT id, order_id, menu_item_id, name, unit_price, quantity
             FROM order_line_item
             WHERE order_id = ANY($1)
             ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut items: HashMap<OrderId, Vec<OrderLineItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items
                .entry(order_id)
                .or_default()
                .push(OrderLineItem::try_from(row)?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                assemble(row, lines)
            })
            .collect()
    }
}

impl OrderStore for PgStore {
    async fn checkout<F, E>(
        &self,
        user_id: UserId,
        promo_code: Option<&str>,
        plan: F,
    ) -> Result<Result<Order, E>, RepositoryError>
    where
        F: FnOnce(&[CheckoutLine], Option<&PromoCode>) -> Result<OrderDraft, E> + Send,
        E: Send,
    {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<CheckoutRow> = sqlx::query_as(
            "SELECT c.id AS entry_id, c.menu_item_id, c.quantity,
                    m.name, m.price AS unit_price, m.restaurant_id
             FROM cart_entry c
             LEFT JOIN menu_item m ON m.id = c.menu_item_id
             WHERE c.user_id = $1
             ORDER BY c.id
             FOR UPDATE OF c",
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await?;
        let lines = rows
            .into_iter()
            .map(CheckoutLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let promo = match promo_code {
            Some(code) => {
                let row: Option<PromoRow> = sqlx::query_as(
                    "SELECT code, discount, valid_until FROM promo_code WHERE code = $1",
                )
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;
                row.map(PromoCode::try_from).transpose()?
            }
            None => None,
        };

        let draft = match plan(&lines, promo.as_ref()) {
            Ok(draft) => draft,
            Err(rejection) => {
                tx.rollback().await?;
                return Ok(Err(rejection));
            }
        };

        let (order_id, created_at): (OrderId, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO customer_order (user_id, restaurant_id, total_price, delivery_address)
             VALUES ($1, $2, $3, $4)
             RETURNING id, created_at",
        )
        .bind(user_id)
        .bind(draft.restaurant_id)
        .bind(draft.total_price)
        .bind(&draft.delivery_address)
        .fetch_one(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in draft.lines {
            let (id,): (OrderLineItemId,) = sqlx::query_as(
                "INSERT INTO order_line_item (order_id, menu_item_id, name, unit_price, quantity)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING id",
            )
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(line.quantity)
            .fetch_one(&mut *tx)
            .await?;
            items.push(OrderLineItem {
                id,
                menu_item_id: line.menu_item_id,
                name: line.name,
                unit_price: line.unit_price,
                quantity: line.quantity,
            });
        }

        // Only the rows locked above; entries committed since stay in the cart.
        let entry_ids: Vec<i32> = lines.iter().map(|l| l.entry_id.as_i32()).collect();
        sqlx::query("DELETE FROM cart_entry WHERE id = ANY($1)")
            .bind(entry_ids)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Ok(Order {
            id: order_id,
            user_id,
            restaurant_id: draft.restaurant_id,
            total_price: draft.total_price,
            delivery_address: draft.delivery_address,
            status: OrderStatus::Pending,
            created_at,
            items,
        }))
    }

    async fn orders_for_user(&self, user_id: UserId, page: Page) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(user_id)
        .bind(i64::from(page.limit()))
        .bind(i64::try_from(page.offset()).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;
        self.with_items(rows).await
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some(row) => Ok(self.with_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn orders_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order
             WHERE restaurant_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.pool)
        .await?;
        self.with_items(rows).await
    }

    async fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE customer_order SET status = $3 WHERE id = $1 AND status = $2")
                .bind(id)
                .bind(from)
                .bind(to)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_promo_code(&self, promo: &PromoCode) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO promo_code (code, discount, valid_until)
             VALUES ($1, $2, $3)
             ON CONFLICT (code)
             DO UPDATE SET discount = EXCLUDED.discount, valid_until = EXCLUDED.valid_until",
        )
        .bind(&promo.code)
        .bind(promo.discount)
        .bind(promo.valid_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
