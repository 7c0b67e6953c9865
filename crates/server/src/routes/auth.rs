//! Session route handlers.
//!
//! Login sets an HttpOnly session cookie and also returns the raw token, so
//! non-browser clients can send it as a bearer header instead.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use forkful_core::{Role, UserId};

use super::ApiJson;
use crate::db::Store;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireSession, cookie_header, removal_cookie, session_cookie, session_token};
use crate::models::{CurrentUser, User};
use crate::services::auth::Registration;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Restaurant accounts only.
    pub cuisine: Option<String>,
    pub delivery_time: Option<i32>,
    pub address: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: UserId,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

/// Attach a `Set-Cookie` header to a response.
fn with_cookie(mut response: Response, cookie: &cookie::Cookie<'_>) -> Result<Response> {
    let value = cookie_header(cookie)
        .ok_or_else(|| AppError::Internal("session cookie is not a valid header".to_string()))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(response)
}

/// Create an account.
///
/// POST /api/auth/register
#[instrument(skip(state, body), fields(role = %body.role))]
pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state
        .auth()
        .register(Registration {
            name: body.name,
            email: body.email,
            password: body.password,
            role: body.role,
            cuisine: body.cuisine,
            delivery_time: body.delivery_time,
            address: body.address,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange credentials for a session.
///
/// POST /api/auth/login
#[instrument(skip_all)]
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response> {
    let issued = state.auth().authenticate(&body.email, &body.password).await?;
    set_sentry_user(&issued.user.id);

    let config = state.config();
    let cookie = session_cookie(
        issued.token.as_str(),
        config.session_ttl(),
        config.secure_cookies(),
    );
    let response = Json(LoginResponse {
        token: issued.token.as_str().to_owned(),
        user_id: issued.user.id,
        role: issued.user.role,
        expires_at: issued.expires_at,
    })
    .into_response();

    with_cookie(response, &cookie)
}

/// Revoke the caller's session and clear the cookie.
///
/// POST /api/auth/logout
///
/// Succeeds even without a session.
#[instrument(skip_all)]
pub async fn logout<S: Store>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Response> {
    if let Some(token) = session_token(&headers) {
        state.auth().revoke(&token).await?;
    }
    clear_sentry_user();

    let cookie = removal_cookie(state.config().secure_cookies());
    with_cookie(StatusCode::NO_CONTENT.into_response(), &cookie)
}

/// Describe the caller's session.
///
/// GET /api/session
pub async fn session(RequireSession(user): RequireSession) -> Json<CurrentUser> {
    Json(user)
}
