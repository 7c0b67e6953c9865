//! Order placement engine.
//!
//! Converts a user's cart into a durable order under one store transaction:
//! the cart is read, validated and priced, the order and its line-item
//! snapshots are written, and the cart is cleared, all or nothing. Also
//! serves order history and restaurant-side status progression.

mod error;
pub mod pricing;

pub use error::OrderError;

use serde::Serialize;
use tracing::{info, instrument};

use forkful_core::{DiscountPercent, OrderId, OrderStatus, RestaurantId};

use self::pricing::{apply_promo, normalize_promo, validate_cart};
use super::ownership::require_owner;
use crate::clock::Clock;
use crate::db::{CatalogStore, OrderStore};
use crate::models::{CurrentUser, Order, Page};

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub order: Order,
    /// Whether a promo code reduced the total.
    pub discount_applied: bool,
    pub discount_percent: Option<DiscountPercent>,
}

/// Order placement and fulfilment service.
pub struct OrderService<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S> OrderService<'a, S>
where
    S: OrderStore + CatalogStore + Sync,
{
    #[must_use]
    pub const fn new(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Turn the actor's cart into an order.
    ///
    /// A blank, unknown or expired promo code leaves the total unchanged.
    ///
    /// # Errors
    ///
    /// Returns, in precedence order, `OrderError::EmptyCart`,
    /// `OrderError::MenuItemVanished`, `OrderError::MixedRestaurantCart` or
    /// `OrderError::MissingAddress`, with the cart untouched. A store failure
    /// rolls back and returns `OrderError::Repository`; the cart is also
    /// untouched in that case.
    #[instrument(skip(self, delivery_address, promo_code), fields(user_id = %actor.user_id))]
    pub async fn place_order(
        &self,
        actor: CurrentUser,
        delivery_address: &str,
        promo_code: Option<&str>,
    ) -> Result<Placement, OrderError> {
        let code = normalize_promo(promo_code);
        let now = self.clock.now();
        let mut discount = None;

        let order = self
            .store
            .checkout(actor.user_id, code, |lines, promo| {
                let mut draft = validate_cart(lines, delivery_address)?;
                let (total, applied) = apply_promo(draft.total_price, code, promo, now);
                draft.total_price = total;
                discount = applied;
                Ok::<_, OrderError>(draft)
            })
            .await??;

        info!(
            order_id = %order.id,
            restaurant_id = %order.restaurant_id,
            total = %order.total_price,
            discount_applied = discount.is_some(),
            "order placed"
        );
        Ok(Placement {
            order,
            discount_applied: discount.is_some(),
            discount_percent: discount,
        })
    }

    /// The actor's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the store fails.
    pub async fn list_orders(&self, actor: CurrentUser, page: Page) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders_for_user(actor.user_id, page).await?)
    }

    /// One of the actor's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::OrderNotFound` if it does not exist or belongs
    /// to someone else.
    pub async fn get_order(&self, actor: CurrentUser, order_id: OrderId) -> Result<Order, OrderError> {
        self.store
            .find_order(order_id)
            .await?
            .filter(|order| order.user_id == actor.user_id)
            .ok_or(OrderError::OrderNotFound)
    }

    /// All orders for a restaurant the actor operates, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::RestaurantNotFound` or `OrderError::NotOwner` if
    /// the ownership check fails.
    pub async fn restaurant_orders(
        &self,
        actor: CurrentUser,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<Order>, OrderError> {
        require_owner(self.store, actor, restaurant_id).await?;
        Ok(self.store.orders_for_restaurant(restaurant_id).await?)
    }

    /// Move an order forward in its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::RestaurantNotFound` or `OrderError::NotOwner` if
    /// the ownership check fails, `OrderError::InvalidStatus` for a value off
    /// the allow-list, `OrderError::OrderNotFound` if the order is not this
    /// restaurant's, `OrderError::InvalidStatusTransition` unless the new
    /// status is strictly later, and `OrderError::StatusConflict` if the
    /// order changed underneath us.
    #[instrument(skip(self), fields(user_id = %actor.user_id))]
    pub async fn update_status(
        &self,
        actor: CurrentUser,
        restaurant_id: RestaurantId,
        order_id: OrderId,
        status: &str,
    ) -> Result<Order, OrderError> {
        require_owner(self.store, actor, restaurant_id).await?;
        let next: OrderStatus = status.parse()?;

        let mut order = self
            .store
            .find_order(order_id)
            .await?
            .filter(|order| order.restaurant_id == restaurant_id)
            .ok_or(OrderError::OrderNotFound)?;

        if !order.status.can_transition_to(next) {
            return Err(OrderError::InvalidStatusTransition {
                from: order.status,
                to: next,
            });
        }

        if !self
            .store
            .transition_order_status(order_id, order.status, next)
            .await?
        {
            return Err(OrderError::StatusConflict);
        }

        info!(order_id = %order_id, from = %order.status, to = %next, "order status updated");
        order.status = next;
        Ok(order)
    }
}
