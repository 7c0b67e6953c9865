//! Order route handlers: checkout and history for customers, the incoming
//! queue and status updates for restaurants.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use forkful_core::{OrderId, RestaurantId};

use super::{ApiJson, ApiPath, ApiQuery};
use crate::db::Store;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireCustomer, RequireRestaurant};
use crate::models::{Order, Page};
use crate::services::orders::Placement;
use crate::state::AppState;

/// Checkout request body.
///
/// A missing address is reported after the cart checks, so it defaults to
/// empty here rather than failing deserialization.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub delivery_address: String,
    pub promo_code: Option<String>,
}

/// Order history paging parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    fn parse_field(raw: Option<&str>, name: &str) -> Result<Option<u32>> {
        raw.map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<u32>()
                    .map_err(|_| AppError::BadRequest(format!("{name} must be a positive integer")))
            })
            .transpose()
    }

    fn into_page(self) -> Result<Page> {
        Ok(Page::new(
            Self::parse_field(self.page.as_deref(), "page")?,
            Self::parse_field(self.limit.as_deref(), "limit")?,
        ))
    }
}

/// Status update request body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

/// Turn the caller's cart into an order.
///
/// POST /api/orders
#[instrument(skip(state, body))]
pub async fn place<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
    ApiJson(body): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Placement>)> {
    let placement = state
        .orders()
        .place_order(user, &body.delivery_address, body.promo_code.as_deref())
        .await?;

    let order_id = placement.order.id.to_string();
    add_breadcrumb("order", "Order placed", Some(&[("order_id", &order_id)]));

    Ok((StatusCode::CREATED, Json(placement)))
}

/// The caller's orders, newest first.
///
/// GET /api/orders?page&limit
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Vec<Order>>> {
    let page = query.into_page()?;
    Ok(Json(state.orders().list_orders(user, page).await?))
}

/// One of the caller's orders.
///
/// GET /api/orders/{id}
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireCustomer(user): RequireCustomer,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get_order(user, order_id).await?))
}

/// All orders placed with a restaurant the caller operates.
///
/// GET /api/restaurants/{id}/orders
pub async fn restaurant_orders<S: Store>(
    State(state): State<AppState<S>>,
    RequireRestaurant(user): RequireRestaurant,
    ApiPath(restaurant_id): ApiPath<RestaurantId>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(
        state
            .orders()
            .restaurant_orders(user, restaurant_id)
            .await?,
    ))
}

/// Move an order forward in its lifecycle.
///
/// PUT /api/restaurants/{id}/orders/{order_id}/status
#[instrument(skip(state, body))]
pub async fn update_status<S: Store>(
    State(state): State<AppState<S>>,
    RequireRestaurant(user): RequireRestaurant,
    ApiPath((restaurant_id, order_id)): ApiPath<(RestaurantId, OrderId)>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .update_status(user, restaurant_id, order_id, &body.status)
        .await?;
    Ok(Json(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> PageQuery {
        PageQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_page_defaults() {
        let page = query(None, Some(" ")).into_page().unwrap();
        assert_eq!(page, Page::default());
    }

    #[test]
    fn test_page_clamped() {
        let page = query(Some("0"), Some("500")).into_page().unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), Page::MAX_LIMIT);
    }

    #[test]
    fn test_page_rejects_garbage() {
        assert!(query(Some("two"), None).into_page().is_err());
        assert!(query(None, Some("-1")).into_page().is_err());
    }
}
