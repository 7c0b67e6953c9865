//! Promo code commands.
//!
//! # Usage
//!
//! ```bash
//! forkful promo create --code WELCOME10 --discount 10 --valid-days 30
//! ```

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use forkful_core::{DiscountPercent, PriceError};
use forkful_server::db::{OrderStore, RepositoryError};
use forkful_server::models::PromoCode;

use super::{CommandError, connect};

/// Errors that can occur during promo operations.
#[derive(Debug, Error)]
pub enum PromoError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    /// Blank code.
    #[error("Promo code cannot be blank")]
    BlankCode,

    /// Discount outside `[0, 100]`.
    #[error("Invalid discount: {0}")]
    InvalidDiscount(#[from] PriceError),

    /// Validity of zero days.
    #[error("Validity must be at least one day")]
    InvalidValidity,

    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Build a promo code valid for `valid_days` from now.
fn build(code: &str, discount: Decimal, valid_days: u32) -> Result<PromoCode, PromoError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(PromoError::BlankCode);
    }
    if valid_days == 0 {
        return Err(PromoError::InvalidValidity);
    }
    Ok(PromoCode {
        code: code.to_owned(),
        discount: DiscountPercent::new(discount)?,
        valid_until: Utc::now() + Duration::days(i64::from(valid_days)),
    })
}

/// Create or replace a promo code.
///
/// # Errors
///
/// Returns `PromoError` for bad input or a store failure.
pub async fn create(code: &str, discount: Decimal, valid_days: u32) -> Result<(), PromoError> {
    let promo = build(code, discount, valid_days)?;
    let (_, store) = connect().await?;

    store.upsert_promo_code(&promo).await?;

    tracing::info!(
        "Promo code saved: {} ({}% off, valid until {})",
        promo.code,
        promo.discount.percent(),
        promo.valid_until
    );
    Ok(())
}
