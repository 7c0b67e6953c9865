//! Catalog route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use forkful_core::RestaurantId;

use super::{ApiPath, ApiQuery};
use crate::db::Store;
use crate::error::Result;
use crate::middleware::RequireRestaurant;
use crate::models::{MenuItem, Restaurant};
use crate::services::catalog::{FilterParams, parse_filter};
use crate::state::AppState;

/// Raw catalog filter parameters.
///
/// Values stay strings so that blank and `all` can mean "no constraint".
#[derive(Debug, Default, Deserialize)]
pub struct RestaurantQuery {
    pub cuisine: Option<String>,
    pub max_delivery_time: Option<String>,
    pub min_rating: Option<String>,
}

/// A restaurant together with its menu.
#[derive(Debug, Serialize)]
pub struct MenuView {
    pub restaurant: Restaurant,
    pub items: Vec<MenuItem>,
}

/// List restaurants matching the filter.
///
/// GET /api/restaurants?cuisine&max_delivery_time&min_rating
pub async fn list<S: Store>(
    State(state): State<AppState<S>>,
    ApiQuery(query): ApiQuery<RestaurantQuery>,
) -> Result<Json<Vec<Restaurant>>> {
    let filter = parse_filter(&FilterParams {
        cuisine: query.cuisine.as_deref(),
        max_delivery_time: query.max_delivery_time.as_deref(),
        min_rating: query.min_rating.as_deref(),
    })?;
    Ok(Json(state.catalog().list_restaurants(&filter).await?))
}

/// Public menu of one restaurant.
///
/// GET /api/restaurants/{id}/menu
pub async fn menu<S: Store>(
    State(state): State<AppState<S>>,
    ApiPath(restaurant_id): ApiPath<RestaurantId>,
) -> Result<Json<MenuView>> {
    let (restaurant, items) = state.catalog().get_menu(restaurant_id).await?;
    Ok(Json(MenuView { restaurant, items }))
}

/// Dishes to suggest on the landing page.
///
/// GET /api/recommended-dishes
pub async fn recommended<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<MenuItem>>> {
    Ok(Json(state.catalog().recommended().await?))
}

/// Restaurants operated by the caller.
///
/// GET /api/me/restaurants
pub async fn mine<S: Store>(
    State(state): State<AppState<S>>,
    RequireRestaurant(user): RequireRestaurant,
) -> Result<Json<Vec<Restaurant>>> {
    Ok(Json(state.catalog().my_restaurants(user).await?))
}
