//! Type-safe money and discount representation using decimal arithmetic.
//!
//! All amounts are in a single currency and carry two decimal places when
//! stored. Arithmetic stays in [`Decimal`] so totals never pick up binary
//! floating point error: `5.00 × 2 + 3.50` is exactly `13.50`.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places kept on stored amounts.
const SCALE: u32 = 2;

/// Errors that can occur when constructing a [`Price`] or [`DiscountPercent`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more precision than a stored price can hold.
    #[error("price must have at most {SCALE} decimal places")]
    TooPrecise,
    /// The amount exceeds [`Price::MAX`].
    #[error("amount cannot exceed {}", Price::MAX)]
    TooLarge,
    /// The discount is outside `[0, 100]`.
    #[error("discount must be between 0 and 100 percent")]
    DiscountOutOfRange,
}

/// A non-negative monetary amount of at most [`Price::MAX`].
///
/// Serialises as a decimal string (`"13.50"`) so clients never parse it as
/// a float.
///
/// ## Examples
///
/// ```
/// use forkful_core::{DiscountPercent, Price};
/// use rust_decimal::Decimal;
///
/// let burger = Price::new(Decimal::new(500, 2)).unwrap();
/// let fries = Price::new(Decimal::new(350, 2)).unwrap();
/// let total = burger.times(2).unwrap().checked_add(fries.times(1).unwrap()).unwrap();
/// assert_eq!(total.amount(), Decimal::new(1350, 2));
/// assert!(Price::MAX.times(2).is_err());
///
/// let ten = DiscountPercent::new(Decimal::from(10)).unwrap();
/// let hundred = Price::new(Decimal::from(100)).unwrap();
/// assert_eq!(hundred.discounted(ten).amount(), Decimal::from(90));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest amount a `NUMERIC(12,2)` column holds: `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, SCALE));

    /// Create a price, rejecting negative, over-precise or oversized amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` if `amount < 0`,
    /// `PriceError::TooPrecise` if it has more than two decimal places and
    /// `PriceError::TooLarge` if it exceeds [`Self::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > SCALE {
            return Err(PriceError::TooPrecise);
        }
        Self::bounded(amount)
    }

    fn bounded(amount: Decimal) -> Result<Self, PriceError> {
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        Ok(Self(amount))
    }

    /// Returns the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `quantity` units at this price.
    ///
    /// Non-positive quantities yield zero; cart entries never hold them.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` if the product exceeds [`Self::MAX`].
    pub fn times(self, quantity: i32) -> Result<Self, PriceError> {
        if quantity <= 0 {
            return Ok(Self::ZERO);
        }
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or(PriceError::TooLarge)
            .and_then(Self::bounded)
    }

    /// Add two amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::TooLarge` if the sum exceeds [`Self::MAX`].
    pub fn checked_add(self, rhs: Self) -> Result<Self, PriceError> {
        self.0
            .checked_add(rhs.0)
            .ok_or(PriceError::TooLarge)
            .and_then(Self::bounded)
    }

    /// Apply a percentage discount, rounding to cents (midpoint away from zero).
    #[must_use]
    pub fn discounted(self, discount: DiscountPercent) -> Self {
        let factor = Decimal::ONE - discount.as_fraction();
        Self(round_cents(self.0 * factor))
    }
}

fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero)
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A percentage discount in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountPercent(Decimal);

impl DiscountPercent {
    /// Create a discount percentage.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::DiscountOutOfRange` outside `[0, 100]`.
    pub fn new(percent: Decimal) -> Result<Self, PriceError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(PriceError::DiscountOutOfRange);
        }
        Ok(Self(percent))
    }

    /// Returns the percentage value (e.g. `10` for ten percent).
    #[must_use]
    pub const fn percent(&self) -> Decimal {
        self.0
    }

    fn as_fraction(self) -> Decimal {
        self.0 / Decimal::ONE_HUNDRED
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for DiscountPercent {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for DiscountPercent {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let percent = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(percent)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for DiscountPercent {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
