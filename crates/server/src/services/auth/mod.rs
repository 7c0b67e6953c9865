//! Session gate.
//!
//! Turns correct credentials into a bounded-lifetime session token and turns
//! a token back into an authorization decision. Every failure to resolve a
//! token surfaces as the same `AuthError::Unauthenticated`; the debug log is
//! the only place the reason is recorded.

mod error;
mod password;
mod token;

pub use error::AuthError;
pub use password::{MIN_PASSWORD_LENGTH, Passwords, validate_password};
pub use token::SessionToken;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use forkful_core::{Email, Role};

use crate::clock::Clock;
use crate::db::{RepositoryError, SessionStore, UserStore};
use crate::models::{CurrentUser, NewRestaurantProfile, NewUser, SessionRecord, User};

/// Input for [`AuthService::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Required for restaurant accounts, ignored otherwise.
    pub cuisine: Option<String>,
    pub delivery_time: Option<i32>,
    pub address: Option<String>,
}

/// A freshly issued session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: SessionToken,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Session gate service.
pub struct AuthService<'a, S> {
    store: &'a S,
    passwords: &'a Passwords,
    clock: &'a dyn Clock,
    session_ttl: Duration,
}

impl<'a, S> AuthService<'a, S>
where
    S: UserStore + SessionStore + Sync,
{
    /// Create a new session gate.
    #[must_use]
    pub const fn new(
        store: &'a S,
        passwords: &'a Passwords,
        clock: &'a dyn Clock,
        session_ttl: Duration,
    ) -> Self {
        Self {
            store,
            passwords,
            clock,
            session_ttl,
        }
    }

    /// Register a new account.
    ///
    /// Restaurant accounts get their restaurant row in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidRegistration` for a blank name, or a
    /// restaurant account without a cuisine.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(role = %registration.role))]
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;

        let name = registration.name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidRegistration("name is required".to_owned()));
        }

        let (cuisine, restaurant) = if registration.role == Role::Restaurant {
            let cuisine = registration
                .cuisine
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .ok_or_else(|| {
                    AuthError::InvalidRegistration(
                        "cuisine is required for restaurant accounts".to_owned(),
                    )
                })?;
            if registration.delivery_time.is_some_and(|t| t < 0) {
                return Err(AuthError::InvalidRegistration(
                    "delivery time cannot be negative".to_owned(),
                ));
            }
            (
                Some(cuisine.to_owned()),
                Some(NewRestaurantProfile {
                    delivery_time: registration.delivery_time,
                    address: registration.address.filter(|a| !a.trim().is_empty()),
                }),
            )
        } else {
            (None, None)
        };

        let password_hash = self.passwords.hash(&registration.password)?;

        let user = self
            .store
            .create_user(NewUser {
                name: name.to_owned(),
                email,
                password_hash,
                role: registration.role,
                cuisine,
                restaurant,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Exchange credentials for a session token.
    ///
    /// An unknown email, a malformed email and a wrong password all return
    /// the same error after the same amount of hashing work.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let credentials = match Email::parse(email) {
            Ok(email) => self.store.find_credentials(&email).await?,
            Err(_) => None,
        };

        let Some(credentials) = credentials else {
            debug!("login for unknown email");
            return Err(self.passwords.verify_dummy(password));
        };

        if let Err(e) = self.passwords.verify(password, &credentials.password_hash) {
            debug!(user_id = %credentials.user.id, "login with wrong password");
            return Err(e);
        }

        let token = SessionToken::generate();
        let expires_at = self.clock.now() + self.session_ttl;
        self.store
            .insert_session(SessionRecord {
                token_hash: token.digest(),
                user_id: credentials.user.id,
                expires_at,
            })
            .await?;

        info!(user_id = %credentials.user.id, "session issued");
        Ok(IssuedSession {
            token,
            user: credentials.user,
            expires_at,
        })
    }

    /// Resolve a token to the acting user, optionally requiring a role.
    ///
    /// The role is read from the user record, not the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` if the token does not resolve to
    /// a live session and user.
    /// Returns `AuthError::Forbidden` if `required_role` is given and differs.
    pub async fn authorize(
        &self,
        raw_token: &str,
        required_role: Option<Role>,
    ) -> Result<CurrentUser, AuthError> {
        let Some(token) = SessionToken::parse(raw_token) else {
            debug!("rejected malformed session token");
            return Err(AuthError::Unauthenticated);
        };
        let digest = token.digest();

        let Some(session) = self.store.find_session(&digest).await? else {
            debug!("rejected unknown session token");
            return Err(AuthError::Unauthenticated);
        };
        if !token::constant_time_compare(&session.token_hash, &digest) {
            debug!("rejected session with mismatched digest");
            return Err(AuthError::Unauthenticated);
        }

        if session.is_expired(self.clock.now()) {
            debug!(user_id = %session.user_id, "rejected expired session token");
            self.store.delete_session(&digest).await?;
            return Err(AuthError::Unauthenticated);
        }

        let Some(user) = self.store.find_user(session.user_id).await? else {
            debug!(user_id = %session.user_id, "rejected session for missing user");
            return Err(AuthError::Unauthenticated);
        };

        if let Some(required) = required_role
            && user.role != required
        {
            debug!(user_id = %user.id, role = %user.role, required = %required, "role mismatch");
            return Err(AuthError::Forbidden);
        }

        Ok(CurrentUser {
            user_id: user.id,
            role: user.role,
        })
    }

    /// Invalidate a token. Unknown or malformed tokens are a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn revoke(&self, raw_token: &str) -> Result<(), AuthError> {
        if let Some(token) = SessionToken::parse(raw_token) {
            self.store.delete_session(&token.digest()).await?;
        }
        Ok(())
    }

    /// Delete every session already past its expiry.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let purged = self.store.delete_expired_sessions(self.clock.now()).await?;
        info!(purged, "purged expired sessions");
        Ok(purged)
    }
}
