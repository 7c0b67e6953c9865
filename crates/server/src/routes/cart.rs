//! Cart route handlers.
//!
//! Mutations answer with the updated cart so the client never has to
//! re-fetch it.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use forkful_core::{CartEntryId, MenuItemId};

use super::{ApiJson, ApiPath};
use crate::db::Store;
use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::services::cart::CartSnapshot;
use crate::state::AppState;

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub menu_item_id: MenuItemId,
    /// Defaults to 1. Applied as a delta when the item is already in the cart.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Set-quantity request body.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    /// Zero or less removes the entry.
    pub quantity: i32,
}

/// Show the caller's cart.
///
/// GET /api/cart
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
) -> Result<Json<CartSnapshot>> {
    Ok(Json(state.carts().snapshot(user).await?))
}

/// Add a menu item.
///
/// POST /api/cart
#[instrument(skip(state))]
pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<Json<CartSnapshot>> {
    let carts = state.carts();
    carts.add(user, body.menu_item_id, body.quantity).await?;
    Ok(Json(carts.snapshot(user).await?))
}

/// Set an entry's quantity.
///
/// PATCH /api/cart/{entry_id}
#[instrument(skip(state))]
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
    ApiPath(entry_id): ApiPath<CartEntryId>,
    ApiJson(body): ApiJson<SetQuantityRequest>,
) -> Result<Json<CartSnapshot>> {
    let carts = state.carts();
    carts.set_quantity(user, entry_id, body.quantity).await?;
    Ok(Json(carts.snapshot(user).await?))
}

/// Remove an entry.
///
/// DELETE /api/cart/{entry_id}
#[instrument(skip(state))]
pub async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
    ApiPath(entry_id): ApiPath<CartEntryId>,
) -> Result<StatusCode> {
    state.carts().remove(user, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
