//! Order placement and fulfilment error types.

use thiserror::Error;

use forkful_core::{OrderStatus, StatusParseError};

use crate::db::RepositoryError;
use crate::services::ownership::OwnershipError;

/// Errors that can occur while placing, reading or progressing orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The user's cart has no entries.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart entry points at a menu item that no longer exists.
    #[error("a menu item in the cart is no longer available")]
    MenuItemVanished,

    /// Cart entries come from more than one restaurant.
    #[error("cart contains items from more than one restaurant")]
    MixedRestaurantCart,

    /// The delivery address is blank.
    #[error("delivery address is required")]
    MissingAddress,

    /// The order total exceeds `Price::MAX`.
    #[error("order total is too large")]
    TotalTooLarge,

    #[error("restaurant not found")]
    RestaurantNotFound,

    #[error("restaurant belongs to another user")]
    NotOwner,

    /// The order does not exist or is not visible to the actor.
    #[error("order not found")]
    OrderNotFound,

    /// The requested status is not on the allow-list.
    #[error(transparent)]
    InvalidStatus(#[from] StatusParseError),

    /// The requested status does not move the order forward.
    #[error("cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// The order changed status between read and write.
    #[error("order status changed concurrently")]
    StatusConflict,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<OwnershipError> for OrderError {
    fn from(e: OwnershipError) -> Self {
        match e {
            OwnershipError::RestaurantNotFound => Self::RestaurantNotFound,
            OwnershipError::NotOwner => Self::NotOwner,
            OwnershipError::Repository(e) => Self::Repository(e),
        }
    }
}
