//! Menu management route handlers.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use forkful_core::{MenuItemId, RestaurantId};

use super::{ApiJson, ApiPath};
use crate::db::Store;
use crate::error::Result;
use crate::middleware::RequireRestaurant;
use crate::models::MenuItem;
use crate::services::menu::MenuItemInput;
use crate::state::AppState;

/// Menu item request body, for both create and update.
#[derive(Debug, Deserialize)]
pub struct MenuItemRequest {
    pub name: String,
    pub price: Decimal,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl From<MenuItemRequest> for MenuItemInput {
    fn from(body: MenuItemRequest) -> Self {
        Self {
            name: body.name,
            price: body.price,
            description: body.description,
            image_url: body.image_url,
        }
    }
}

/// Add an item to the caller's restaurant.
///
/// POST /api/restaurants/{id}/menu
#[instrument(skip(state, body))]
pub async fn create<S: Store>(
    State(state): State<AppState<S>>,
    RequireRestaurant(user): RequireRestaurant,
    ApiPath(restaurant_id): ApiPath<RestaurantId>,
    ApiJson(body): ApiJson<MenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>)> {
    let item = state
        .menus()
        .add_menu_item(user, restaurant_id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace an item's fields.
///
/// PUT /api/restaurants/{id}/menu/{item_id}
#[instrument(skip(state, body))]
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    RequireRestaurant(user): RequireRestaurant,
    ApiPath((restaurant_id, item_id)): ApiPath<(RestaurantId, MenuItemId)>,
    ApiJson(body): ApiJson<MenuItemRequest>,
) -> Result<Json<MenuItem>> {
    let item = state
        .menus()
        .update_menu_item(user, restaurant_id, item_id, body.into())
        .await?;
    Ok(Json(item))
}

/// Delete an item. Cart entries holding it go with it; past orders keep
/// their snapshot.
///
/// DELETE /api/restaurants/{id}/menu/{item_id}
#[instrument(skip(state))]
pub async fn delete<S: Store>(
    State(state): State<AppState<S>>,
    RequireRestaurant(user): RequireRestaurant,
    ApiPath((restaurant_id, item_id)): ApiPath<(RestaurantId, MenuItemId)>,
) -> Result<StatusCode> {
    state
        .menus()
        .delete_menu_item(user, restaurant_id, item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
