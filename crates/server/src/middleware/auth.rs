//! Authentication extractors.
//!
//! Every extractor resolves the request's session token through the session
//! gate, so an expired or revoked session is rejected on the very next
//! request. The role is re-read from the user row each time.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(RequireCustomer(user): RequireCustomer) -> impl IntoResponse {
//!     format!("Hello, user {}!", user.user_id)
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use forkful_core::Role;

use super::session::session_token;
use crate::db::Store;
use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Extractor that requires any valid session.
pub struct RequireSession(pub CurrentUser);

/// Extractor that requires a session belonging to a customer account.
pub struct RequireCustomer(pub CurrentUser);

/// Extractor that requires a session belonging to a restaurant account.
pub struct RequireRestaurant(pub CurrentUser);

async fn authorize<S: Store>(
    parts: &Parts,
    state: &AppState<S>,
    required_role: Option<Role>,
) -> Result<CurrentUser, AppError> {
    let token = session_token(&parts.headers).ok_or(AuthError::Unauthenticated)?;
    let user = state.auth().authorize(&token, required_role).await?;
    set_sentry_user(&user.user_id);
    tracing::Span::current().record("user_id", user.user_id.as_i32());
    Ok(user)
}

impl<S: Store> FromRequestParts<AppState<S>> for RequireSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, None).await.map(Self)
    }
}

impl<S: Store> FromRequestParts<AppState<S>> for RequireCustomer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Some(Role::Customer)).await.map(Self)
    }
}

impl<S: Store> FromRequestParts<AppState<S>> for RequireRestaurant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        authorize(parts, state, Some(Role::Restaurant)).await.map(Self)
    }
}
