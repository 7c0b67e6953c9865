//! Order aggregate types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use forkful_core::{MenuItemId, OrderId, OrderLineItemId, OrderStatus, Price, RestaurantId, UserId};

/// A placed order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    /// Frozen at placement: Σ(unit price × quantity), less any discount.
    pub total_price: Price,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLineItem>,
}

/// An immutable snapshot of one menu item at the moment the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineItem {
    pub id: OrderLineItemId,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: i32,
}

/// A validated, priced order ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub restaurant_id: RestaurantId,
    pub total_price: Price,
    pub delivery_address: String,
    pub lines: Vec<LineDraft>,
}

/// One line of an [`OrderDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDraft {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: i32,
}

/// Offset pagination for order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    page: u32,
    limit: u32,
}

impl Page {
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page, clamping out-of-range values into the accepted window.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Rows per page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64).saturating_sub(1) * self.limit as u64
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
