//! Accounts and restaurant registration.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use forkful_core::{Email, Role, UserId};

use super::{PgStore, conflict_on_unique, corrupt};
use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, User, UserCredentials};

const USER_COLUMNS: &str = "id, name, email, role, cuisine, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: String,
    role: Role,
    cuisine: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| corrupt("email", e))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            email,
            role: row.role,
            cuisine: row.cuisine,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO app_user (name, email, password_hash, role, cuisine)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role)
        .bind(&new.cuisine)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email already exists"))?;

        if let Some(profile) = &new.restaurant {
            sqlx::query(
                "INSERT INTO restaurant (owner_id, name, cuisine, delivery_time, address)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(row.id)
            .bind(&new.name)
            .bind(new.cuisine.as_deref().unwrap_or_default())
            .bind(profile.delivery_time)
            .bind(&profile.address)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        User::try_from(row)
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let row: Option<CredentialsRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM app_user WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(UserCredentials {
                user: User::try_from(r.user)?,
                password_hash: r.password_hash,
            })
        })
        .transpose()
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM app_user WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }
}
