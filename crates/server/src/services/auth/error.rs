//! Session gate error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during registration, login and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] forkful_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token absent, malformed, unknown, expired, or its user is gone.
    #[error("not authenticated")]
    Unauthenticated,

    /// Authenticated, but the account's role does not permit the operation.
    #[error("forbidden")]
    Forbidden,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// A registration field is missing or malformed.
    #[error("{0}")]
    InvalidRegistration(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
