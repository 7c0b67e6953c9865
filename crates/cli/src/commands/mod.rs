//! CLI subcommands.

pub mod migrate;
pub mod promo;
pub mod sessions;

use forkful_server::config::{ConfigError, ForkfulConfig};
use forkful_server::db::{create_pool, postgres::PgStore};
use thiserror::Error;

/// Errors shared by every command that talks to the database.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment is missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load configuration and open a store on the configured database.
pub async fn connect() -> Result<(ForkfulConfig, PgStore), CommandError> {
    let config = ForkfulConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;

    Ok((config, PgStore::new(pool)))
}
