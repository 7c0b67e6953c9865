//! Promotional discount codes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use forkful_core::DiscountPercent;

/// A time-boxed percentage discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoCode {
    pub code: String,
    pub discount: DiscountPercent,
    pub valid_until: DateTime<Utc>,
}

impl PromoCode {
    /// Whether the code can still be redeemed at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.valid_until > now
    }
}
