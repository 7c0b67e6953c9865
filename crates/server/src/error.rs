//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Every error renders as `{"error": {"kind": "...", "message": "..."}}`.
//! Store failures render as a generic `internal` error; their detail only
//! reaches the logs and Sentry.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::menu::MenuError;
use crate::services::orders::OrderError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session gate operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog query failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Menu edit failed.
    #[error("Menu error: {0}")]
    Menu(#[from] MenuError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    kind: &'static str,
    message: String,
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        "Internal server error".to_string(),
    )
}

fn validation(message: String) -> (StatusCode, &'static str, String) {
    (StatusCode::BAD_REQUEST, "validation", message)
}

fn not_found(message: &str) -> (StatusCode, &'static str, String) {
    (StatusCode::NOT_FOUND, "not_found", message.to_string())
}

fn not_owner() -> (StatusCode, &'static str, String) {
    (
        StatusCode::FORBIDDEN,
        "not_owner",
        "You do not own this resource".to_string(),
    )
}

fn inconsistent(kind: &'static str, err: &impl ToString) -> (StatusCode, &'static str, String) {
    (StatusCode::UNPROCESSABLE_ENTITY, kind, err.to_string())
}

impl AppError {
    /// Whether this error is the server's fault.
    fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Cart(CartError::Repository(_))
                | Self::Catalog(CatalogError::Repository(_))
                | Self::Menu(MenuError::Repository(_))
                | Self::Order(OrderError::Repository(_))
        )
    }

    /// Status, machine-readable kind and client-safe message.
    fn classify(&self) -> (StatusCode, &'static str, String) {
        if self.is_server_error() {
            return internal();
        }
        match self {
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_credentials",
                    "Invalid credentials".to_string(),
                ),
                AuthError::Unauthenticated => (
                    StatusCode::UNAUTHORIZED,
                    "unauthenticated",
                    "Authentication required".to_string(),
                ),
                AuthError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    "This account cannot perform this action".to_string(),
                ),
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "user_already_exists",
                    "An account with this email already exists".to_string(),
                ),
                AuthError::InvalidEmail(_) => validation("Invalid email address".to_string()),
                AuthError::WeakPassword(msg) | AuthError::InvalidRegistration(msg) => {
                    validation(msg.clone())
                }
                AuthError::Repository(_) | AuthError::PasswordHash => internal(),
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => {
                    (StatusCode::BAD_REQUEST, "invalid_quantity", err.to_string())
                }
                CartError::MenuItemNotFound => not_found("Menu item not found"),
                CartError::EntryNotFound => not_found("Cart entry not found"),
                CartError::NotOwner => not_owner(),
                CartError::SubtotalTooLarge => inconsistent("total_too_large", err),
                CartError::Repository(_) => internal(),
            },
            Self::Catalog(err) => match err {
                CatalogError::InvalidFilter(_) => validation(err.to_string()),
                CatalogError::RestaurantNotFound => not_found("Restaurant not found"),
                CatalogError::Repository(_) => internal(),
            },
            Self::Menu(err) => match err {
                MenuError::RestaurantNotFound => not_found("Restaurant not found"),
                MenuError::MenuItemNotFound => not_found("Menu item not found"),
                MenuError::NotOwner => not_owner(),
                MenuError::MissingName | MenuError::InvalidPrice(_) => validation(err.to_string()),
                MenuError::Repository(_) => internal(),
            },
            Self::Order(err) => match err {
                OrderError::EmptyCart => inconsistent("empty_cart", err),
                OrderError::MenuItemVanished => inconsistent("menu_item_vanished", err),
                OrderError::MixedRestaurantCart => inconsistent("mixed_restaurant_cart", err),
                OrderError::MissingAddress => inconsistent("missing_address", err),
                OrderError::TotalTooLarge => inconsistent("total_too_large", err),
                OrderError::InvalidStatusTransition { .. } => {
                    inconsistent("invalid_status_transition", err)
                }
                OrderError::RestaurantNotFound => not_found("Restaurant not found"),
                OrderError::OrderNotFound => not_found("Order not found"),
                OrderError::NotOwner => not_owner(),
                OrderError::InvalidStatus(_) => {
                    (StatusCode::BAD_REQUEST, "invalid_status", err.to_string())
                }
                OrderError::StatusConflict => {
                    (StatusCode::CONFLICT, "status_conflict", err.to_string())
                }
                OrderError::Repository(_) => internal(),
            },
            Self::BadRequest(msg) => validation(msg.clone()),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests".to_string(),
            ),
            Self::Database(_) | Self::Internal(_) => internal(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let (status, kind, message) = self.classify();
        let body = ErrorBody {
            error: ErrorDetail { kind, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
