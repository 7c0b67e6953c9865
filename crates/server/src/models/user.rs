//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use forkful_core::{Email, Role, UserId};

/// A registered account (domain type).
///
/// The password hash is deliberately absent; see [`UserCredentials`].
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Normalised login email.
    pub email: Email,
    /// Role fixed at registration.
    pub role: Role,
    /// Cuisine tag, only set for restaurant accounts.
    pub cuisine: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// A user together with their stored password hash.
///
/// Only the session gate handles this type.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Restaurant details captured at registration of a restaurant account.
#[derive(Debug, Clone, Default)]
pub struct NewRestaurantProfile {
    /// Estimated delivery time in minutes.
    pub delivery_time: Option<i32>,
    /// Street address.
    pub address: Option<String>,
}

/// Data needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: String,
    pub role: Role,
    pub cuisine: Option<String>,
    /// Present exactly when `role` is [`Role::Restaurant`]; the store creates
    /// the restaurant row in the same transaction as the user.
    pub restaurant: Option<NewRestaurantProfile>,
}
