//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! # Sessions
//! POST   /api/auth/register                          - Create an account
//! POST   /api/auth/login                             - Issue a session (cookie + token)
//! POST   /api/auth/logout                            - Revoke the session
//! GET    /api/session                                - Who am I
//!
//! # Catalog
//! GET    /api/restaurants                            - Filtered restaurant list
//! GET    /api/restaurants/{id}/menu                  - Public menu
//! GET    /api/recommended-dishes                     - A few dishes from anywhere
//! GET    /api/me/restaurants                         - Restaurants I operate
//!
//! # Menu management (restaurant accounts)
//! POST   /api/restaurants/{id}/menu                  - Add item
//! PUT    /api/restaurants/{id}/menu/{item_id}        - Edit item
//! DELETE /api/restaurants/{id}/menu/{item_id}        - Delete item
//!
//! # Fulfilment (restaurant accounts)
//! GET    /api/restaurants/{id}/orders                - Incoming orders
//! PUT    /api/restaurants/{id}/orders/{order_id}/status - Advance status
//!
//! # Cart (customer accounts)
//! GET    /api/cart                                   - Cart with subtotal
//! POST   /api/cart                                   - Add item
//! PATCH  /api/cart/{entry_id}                        - Set quantity
//! DELETE /api/cart/{entry_id}                        - Remove entry
//!
//! # Orders (customer accounts)
//! POST   /api/orders                                 - Place order from cart
//! GET    /api/orders                                 - Order history (?page&limit)
//! GET    /api/orders/{id}                            - One order
//! ```

pub mod auth;
pub mod cart;
pub mod menu;
pub mod orders;
pub mod restaurants;

use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    routing::{get, patch, post, put},
};

use crate::db::Store;
use crate::error::AppError;
use crate::middleware::{auth_rate_limiter, rate_limit_json, require_client_ip};
use crate::state::AppState;

/// JSON body extractor whose rejection is an [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path extractor whose rejection is an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string extractor whose rejection is an [`AppError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Create the credential routes router, behind the auth rate limiter.
pub fn auth_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/register", post(auth::register::<S>))
        .route("/login", post(auth::login::<S>))
        .route("/logout", post(auth::logout::<S>))
        .layer(auth_rate_limiter())
        .layer(axum::middleware::from_fn(require_client_ip))
        .layer(axum::middleware::map_response(rate_limit_json))
}

/// Create the restaurant routes router: catalog, menu management and fulfilment.
pub fn restaurant_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(restaurants::list::<S>))
        .route(
            "/{id}/menu",
            get(restaurants::menu::<S>).post(menu::create::<S>),
        )
        .route(
            "/{id}/menu/{item_id}",
            put(menu::update::<S>).delete(menu::delete::<S>),
        )
        .route("/{id}/orders", get(orders::restaurant_orders::<S>))
        .route(
            "/{id}/orders/{order_id}/status",
            put(orders::update_status::<S>),
        )
}

/// Create the cart routes router.
pub fn cart_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>).post(cart::add::<S>))
        .route(
            "/{entry_id}",
            patch(cart::update::<S>).delete(cart::remove::<S>),
        )
}

/// Create the order routes router.
pub fn order_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(orders::index::<S>).post(orders::place::<S>))
        .route("/{id}", get(orders::show::<S>))
}

/// Create all API routes.
pub fn routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .route("/api/session", get(auth::session))
        .route("/api/me/restaurants", get(restaurants::mine::<S>))
        .route("/api/recommended-dishes", get(restaurants::recommended::<S>))
        .nest("/api/restaurants", restaurant_routes())
        .nest("/api/cart", cart_routes())
        .nest("/api/orders", order_routes())
}
