//! Cart validation and pricing.
//!
//! Pure functions over the checkout snapshot; the store runs them inside the
//! checkout transaction.

use chrono::{DateTime, Utc};
use tracing::info;

use forkful_core::{DiscountPercent, Price};

use super::OrderError;
use crate::models::{CheckoutLine, LineDraft, OrderDraft, PromoCode};

/// Check the cart preconditions in order and snapshot each line.
///
/// # Errors
///
/// `EmptyCart`, `MenuItemVanished`, `MixedRestaurantCart`, then
/// `MissingAddress`, whichever fails first; `TotalTooLarge` if the lines
/// sum past `Price::MAX`.
pub fn validate_cart(lines: &[CheckoutLine], delivery_address: &str) -> Result<OrderDraft, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyCart);
    }

    let mut drafts = Vec::with_capacity(lines.len());
    for line in lines {
        let item = line.item.as_ref().ok_or(OrderError::MenuItemVanished)?;
        drafts.push((item.restaurant_id, LineDraft {
            menu_item_id: line.menu_item_id,
            name: item.name.clone(),
            unit_price: item.unit_price,
            quantity: line.quantity,
        }));
    }

    let restaurant_id = drafts
        .first()
        .map(|(restaurant_id, _)| *restaurant_id)
        .ok_or(OrderError::MenuItemVanished)?;
    if drafts.iter().any(|(r, _)| *r != restaurant_id) {
        return Err(OrderError::MixedRestaurantCart);
    }

    let delivery_address = delivery_address.trim();
    if delivery_address.is_empty() {
        return Err(OrderError::MissingAddress);
    }

    let lines: Vec<LineDraft> = drafts.into_iter().map(|(_, line)| line).collect();
    let total_price = lines
        .iter()
        .try_fold(Price::ZERO, |acc, l| acc.checked_add(l.unit_price.times(l.quantity)?))
        .map_err(|_| OrderError::TotalTooLarge)?;

    Ok(OrderDraft {
        restaurant_id,
        total_price,
        delivery_address: delivery_address.to_owned(),
        lines,
    })
}

/// Apply a promo code to `total` if it is still valid at `now`.
///
/// Unknown and expired codes are skipped, not rejected.
#[must_use]
pub fn apply_promo(
    total: Price,
    requested: Option<&str>,
    promo: Option<&PromoCode>,
    now: DateTime<Utc>,
) -> (Price, Option<DiscountPercent>) {
    let Some(code) = requested else {
        return (total, None);
    };
    match promo {
        Some(promo) if promo.is_active(now) => (total.discounted(promo.discount), Some(promo.discount)),
        Some(_) => {
            info!(code, "promo code expired, charging full price");
            (total, None)
        }
        None => {
            info!(code, "promo code unknown, charging full price");
            (total, None)
        }
    }
}

/// Normalise a client promo code; blank means none.
#[must_use]
pub fn normalize_promo(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|c| !c.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;
    use rust_decimal::Decimal;

    use forkful_core::{CartEntryId, MenuItemId, RestaurantId};

    use super::*;
    use crate::models::MenuItemSnapshot;

    fn price(cents: i64) -> Price {
        Price::new(Decimal::new(cents, 2)).unwrap()
    }

    fn line(id: i32, restaurant: i32, cents: i64, quantity: i32) -> CheckoutLine {
        CheckoutLine {
            entry_id: CartEntryId::new(id),
            menu_item_id: MenuItemId::new(id),
            quantity,
            item: Some(MenuItemSnapshot {
                name: format!("item {id}"),
                unit_price: price(cents),
                restaurant_id: RestaurantId::new(restaurant),
            }),
        }
    }

    fn promo(percent: i64, valid_for: Duration) -> PromoCode {
        PromoCode {
            code: "SAVE".to_owned(),
            discount: DiscountPercent::new(Decimal::from(percent)).unwrap(),
            valid_until: Utc::now() + valid_for,
        }
    }

    #[test]
    fn test_total_is_sum_of_line_totals() {
        let draft = validate_cart(&[line(1, 1, 500, 2), line(2, 1, 350, 1)], "1 Main St").unwrap();
        assert_eq!(draft.total_price, price(1350));
        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[0].unit_price, price(500));
        assert_eq!(draft.restaurant_id, RestaurantId::new(1));
    }

    #[test]
    fn test_precondition_order() {
        assert!(matches!(validate_cart(&[], ""), Err(OrderError::EmptyCart)));

        let mut vanished = line(1, 1, 500, 1);
        vanished.item = None;
        // Vanished is reported before mixed and before a missing address.
        assert!(matches!(
            validate_cart(&[line(2, 2, 100, 1), vanished], ""),
            Err(OrderError::MenuItemVanished)
        ));
        assert!(matches!(
            validate_cart(&[line(1, 1, 500, 1), line(2, 2, 100, 1)], ""),
            Err(OrderError::MixedRestaurantCart)
        ));
        assert!(matches!(
            validate_cart(&[line(1, 1, 500, 1)], "   "),
            Err(OrderError::MissingAddress)
        ));
    }

    #[test]
    fn test_total_past_max_is_rejected() {
        let mut big = line(1, 1, 0, 2);
        if let Some(item) = big.item.as_mut() {
            item.unit_price = Price::MAX;
        }
        assert!(matches!(
            validate_cart(&[big], "1 Main St"),
            Err(OrderError::TotalTooLarge)
        ));

        let mut exact = line(1, 1, 0, 1);
        if let Some(item) = exact.item.as_mut() {
            item.unit_price = Price::MAX;
        }
        assert!(matches!(
            validate_cart(&[exact.clone(), line(2, 1, 1, 1)], "1 Main St"),
            Err(OrderError::TotalTooLarge)
        ));
        assert_eq!(validate_cart(&[exact], "1 Main St").unwrap().total_price, Price::MAX);
    }

    #[test]
    fn test_valid_promo_discounts() {
        let code = promo(10, Duration::days(1));
        let (total, applied) = apply_promo(price(10_000), Some("SAVE"), Some(&code), Utc::now());
        assert_eq!(total, price(9_000));
        assert_eq!(applied, Some(code.discount));
    }

    #[test]
    fn test_expired_or_unknown_promo_is_skipped() {
        let expired = promo(10, -Duration::days(1));
        assert_eq!(
            apply_promo(price(10_000), Some("SAVE"), Some(&expired), Utc::now()),
            (price(10_000), None)
        );
        assert_eq!(
            apply_promo(price(10_000), Some("NOPE"), None, Utc::now()),
            (price(10_000), None)
        );
    }

    #[test]
    fn test_blank_promo_is_none() {
        assert_eq!(normalize_promo(Some("   ")), None);
        assert_eq!(normalize_promo(Some(" SAVE ")), Some("SAVE"));
        assert_eq!(normalize_promo(None), None);
    }
}
