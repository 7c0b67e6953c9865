//! Persistence layer for the ordering service.
//!
//! # Stores
//!
//! Each collaborator the services depend on is a trait:
//!
//! - [`UserStore`] - accounts and password hashes
//! - [`SessionStore`] - hashed session tokens with absolute expiry
//! - [`CatalogStore`] - restaurants and menu items
//! - [`CartStore`] - the per-user cart ledger
//! - [`OrderStore`] - orders, line items, promo codes and the checkout transaction
//!
//! [`PgStore`] is the production backend. [`MemoryStore`] keeps everything
//! behind a single mutex and backs the test suites.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p forkful-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use forkful_core::{CartEntryId, Email, MenuItemId, OrderId, OrderStatus, RestaurantId, UserId};

use crate::models::{
    CartAdjustment, CartEntry, CartLine, CheckoutLine, MenuItem, MenuItemUpdate, NewMenuItem,
    NewUser, Order, OrderDraft, Page, PromoCode, Restaurant, RestaurantFilter, SessionRecord, User,
    UserCredentials,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Accounts and their password hashes.
pub trait UserStore {
    /// Insert a user, and for restaurant accounts their restaurant, atomically.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    fn create_user(&self, new: NewUser)
    -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Look up a user and password hash by normalised email.
    fn find_credentials(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<UserCredentials>, RepositoryError>> + Send;

    /// Look up a user by ID.
    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;
}

/// Session rows keyed by token hash.
pub trait SessionStore {
    fn insert_session(
        &self,
        record: SessionRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find_session(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>, RepositoryError>> + Send;

    /// Delete a session. Deleting an unknown hash is not an error.
    fn delete_session(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every session whose expiry is at or before `now`.
    fn delete_expired_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Restaurants and menu items.
pub trait CatalogStore {
    fn list_restaurants(
        &self,
        filter: &RestaurantFilter,
    ) -> impl Future<Output = Result<Vec<Restaurant>, RepositoryError>> + Send;

    fn find_restaurant(
        &self,
        id: RestaurantId,
    ) -> impl Future<Output = Result<Option<Restaurant>, RepositoryError>> + Send;

    fn restaurants_owned_by(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<Restaurant>, RepositoryError>> + Send;

    fn menu_for(
        &self,
        restaurant: RestaurantId,
    ) -> impl Future<Output = Result<Vec<MenuItem>, RepositoryError>> + Send;

    fn find_menu_item(
        &self,
        id: MenuItemId,
    ) -> impl Future<Output = Result<Option<MenuItem>, RepositoryError>> + Send;

    /// Up to `limit` menu items from any restaurant, in no particular order.
    fn random_menu_items(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<MenuItem>, RepositoryError>> + Send;

    fn insert_menu_item(
        &self,
        new: NewMenuItem,
    ) -> impl Future<Output = Result<MenuItem, RepositoryError>> + Send;

    /// Returns `RepositoryError::NotFound` if the item does not exist.
    fn update_menu_item(
        &self,
        id: MenuItemId,
        update: MenuItemUpdate,
    ) -> impl Future<Output = Result<MenuItem, RepositoryError>> + Send;

    /// Delete an item and every cart entry referencing it.
    ///
    /// Returns `RepositoryError::NotFound` if the item does not exist.
    fn delete_menu_item(
        &self,
        id: MenuItemId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// The per-user cart ledger.
pub trait CartStore {
    /// Apply `delta` to the (user, item) entry atomically.
    ///
    /// Inserts when no entry exists and `delta > 0`; deletes when the result
    /// is not positive. A result above `CartEntry::MAX_QUANTITY` writes
    /// nothing and reports `OverLimit`. Callers keep `delta` itself within
    /// that cap.
    fn adjust_cart_entry(
        &self,
        user_id: UserId,
        menu_item_id: MenuItemId,
        delta: i32,
    ) -> impl Future<Output = Result<CartAdjustment, RepositoryError>> + Send;

    fn find_cart_entry(
        &self,
        id: CartEntryId,
    ) -> impl Future<Output = Result<Option<CartEntry>, RepositoryError>> + Send;

    /// Overwrite an entry's quantity. `quantity` must be positive.
    fn set_cart_quantity(
        &self,
        id: CartEntryId,
        quantity: i32,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn delete_cart_entry(
        &self,
        id: CartEntryId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// The user's entries joined with their live menu rows, ordered by entry ID.
    fn cart_lines(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CartLine>, RepositoryError>> + Send;
}

/// Orders, promo codes and the checkout transaction.
pub trait OrderStore {
    /// Convert a user's cart into an order inside one transaction.
    ///
    /// The user's cart rows are locked and read together with their menu rows
    /// and the promo code (if any), then handed to `plan`. If `plan` returns
    /// a draft, the order and its line items are inserted and exactly the
    /// entries handed to `plan` are deleted before commit. If `plan` rejects, nothing is written and the
    /// rejection is returned in the inner `Result`.
    fn checkout<F, E>(
        &self,
        user_id: UserId,
        promo_code: Option<&str>,
        plan: F,
    ) -> impl Future<Output = Result<Result<Order, E>, RepositoryError>> + Send
    where
        F: FnOnce(&[CheckoutLine], Option<&PromoCode>) -> Result<OrderDraft, E> + Send,
        E: Send;

    /// A customer's orders, newest first.
    fn orders_for_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    fn find_order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// A restaurant's orders, newest first.
    fn orders_for_restaurant(
        &self,
        restaurant_id: RestaurantId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Compare-and-set the status. Returns `false` if the order was not in `from`.
    fn transition_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Insert or replace a promo code.
    fn upsert_promo_code(
        &self,
        promo: &PromoCode,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Everything the application needs from persistence.
pub trait Store:
    UserStore + SessionStore + CatalogStore + CartStore + OrderStore + Clone + Send + Sync + 'static
{
    /// Round-trip to the backend for readiness checks.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
