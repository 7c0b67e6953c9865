//! Session maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! forkful sessions purge
//! ```
//!
//! Expired sessions are already rejected and deleted lazily on use; the sweep
//! only reclaims rows that are never presented again.

use forkful_server::clock::SystemClock;
use forkful_server::services::auth::{AuthError, AuthService, Passwords};
use thiserror::Error;

use super::{CommandError, connect};

/// Errors that can occur during session maintenance.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Session gate error: {0}")]
    Auth(#[from] AuthError),
}

/// Delete every expired session. Returns how many were removed.
///
/// # Errors
///
/// Returns `SessionError` if the database is unreachable.
pub async fn purge() -> Result<u64, SessionError> {
    let (config, store) = connect().await?;
    let passwords = Passwords::production()?;
    let clock = SystemClock;

    let purged = AuthService::new(&store, &passwords, &clock, config.session_ttl())
        .purge_expired()
        .await?;

    tracing::info!("Purged {} expired sessions", purged);
    Ok(purged)
}
