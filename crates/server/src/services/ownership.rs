//! Restaurant ownership checks.
//!
//! Ownership is read from the store on every call and never cached, so a
//! reassigned or deleted restaurant is noticed immediately.

use thiserror::Error;

use forkful_core::RestaurantId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{CurrentUser, Restaurant};

/// Why the acting user may not operate on a restaurant.
#[derive(Debug, Error)]
pub enum OwnershipError {
    #[error("restaurant not found")]
    RestaurantNotFound,

    #[error("restaurant belongs to another user")]
    NotOwner,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Load `restaurant_id` and check that `actor` operates it.
///
/// # Errors
///
/// Returns `OwnershipError::RestaurantNotFound` if it does not exist and
/// `OwnershipError::NotOwner` if another account operates it.
pub async fn require_owner<S>(
    store: &S,
    actor: CurrentUser,
    restaurant_id: RestaurantId,
) -> Result<Restaurant, OwnershipError>
where
    S: CatalogStore + Sync,
{
    let restaurant = store
        .find_restaurant(restaurant_id)
        .await?
        .ok_or(OwnershipError::RestaurantNotFound)?;
    if restaurant.owner_id != actor.user_id {
        tracing::debug!(
            user_id = %actor.user_id,
            restaurant_id = %restaurant_id,
            "ownership check failed"
        );
        return Err(OwnershipError::NotOwner);
    }
    Ok(restaurant)
}
