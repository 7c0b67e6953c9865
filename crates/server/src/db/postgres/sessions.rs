//! Session rows.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use forkful_core::UserId;

use super::{PgStore, conflict_on_unique};
use crate::db::{RepositoryError, SessionStore};
use crate::models::SessionRecord;

#[derive(Debug, FromRow)]
struct SessionRow {
    token_hash: String,
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            token_hash: row.token_hash,
            user_id: row.user_id,
            expires_at: row.expires_at,
        }
    }
}

impl SessionStore for PgStore {
    async fn insert_session(&self, record: SessionRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_session (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "session token collision"))?;
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRecord>, RepositoryError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT token_hash, user_id, expires_at FROM user_session WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SessionRecord::from))
    }

    async fn delete_session(&self, token_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM user_session WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM user_session WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
