//! Session-related types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use forkful_core::{Role, UserId};

/// A persisted session row.
///
/// Holds the subject only. The role is read from the user record on every
/// authorization so a session can never carry a stale role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Hex SHA-256 digest of the bearer token.
    pub token_hash: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session is past its absolute expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// The authenticated identity resolved from a session token.
///
/// Threaded explicitly through every service call that acts on behalf of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub role: Role,
}
