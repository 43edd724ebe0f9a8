//! # Pricing Engine
//!
//! Pure functions that price a cart line and aggregate a cart.
//!
//! ## Pricing Branches
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    line_subtotal(product, qty, grams)                   │
//! │                                                                         │
//! │   is_weighable?                                                        │
//! │     ├── yes → grams required          → grams × price_per_gram         │
//! │     │         price_per_gram required                                  │
//! │     │                                                                   │
//! │     └── no  → unit_price required     → quantity × unit_price          │
//! │                                                                         │
//! │   price_per_gram is already per gram: callers never scale by 1000.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::cart::LineItem;
use crate::error::PricingError;
use crate::money::Money;
use crate::types::Product;
use crate::MAX_LINE_SUBTOTAL_CENTS;

/// Prices one line.
///
/// `quantity` is ignored for weighable products, `weight_grams` for
/// unit-priced ones. Catalog prices are not bounded, so an oversized
/// product is an `AmountTooLarge` rather than an overflow.
///
/// ## Example
/// ```rust
/// use mesa_core::pricing::line_subtotal;
/// # use chrono::Utc;
/// # let product = mesa_core::Product {
/// #     id: "p1".into(), code: "A".into(), name: "Suco".into(),
/// #     is_weighable: false, unit_price_cents: Some(1000),
/// #     price_per_gram_millicents: None, is_active: true,
/// #     created_at: Utc::now(), updated_at: Utc::now(),
/// # };
///
/// assert_eq!(line_subtotal(&product, 2, None).unwrap().cents(), 2000);
/// ```
pub fn line_subtotal(
    product: &Product,
    quantity: i64,
    weight_grams: Option<i64>,
) -> Result<Money, PricingError> {
    if product.is_weighable {
        let rate = product
            .price_per_gram()
            .ok_or_else(|| PricingError::MissingPrice {
                code: product.code.clone(),
                field: "price_per_gram",
            })?;
        let grams = weight_grams.ok_or_else(|| PricingError::MissingWeight {
            code: product.code.clone(),
        })?;
        within_line_limit(product, rate.price_for_grams(grams))
    } else {
        let unit_price = product
            .unit_price()
            .ok_or_else(|| PricingError::MissingPrice {
                code: product.code.clone(),
                field: "unit_price",
            })?;
        within_line_limit(product, unit_price.multiply_quantity(quantity))
    }
}

fn within_line_limit(product: &Product, subtotal: Option<Money>) -> Result<Money, PricingError> {
    subtotal
        .filter(|s| s.cents().unsigned_abs() <= MAX_LINE_SUBTOTAL_CENTS as u64)
        .ok_or_else(|| PricingError::AmountTooLarge {
            code: product.code.clone(),
        })
}

/// Sums line subtotals in cart (insertion) order.
pub fn cart_subtotal(lines: &[LineItem]) -> Money {
    lines.iter().map(LineItem::subtotal).sum()
}

/// `max(0, subtotal - discount)`. Oversized discounts are clamped, not rejected.
///
/// ## Example
/// ```rust
/// use mesa_core::money::Money;
/// use mesa_core::pricing::cart_total;
///
/// let total = cart_total(Money::from_cents(2000), Money::from_cents(2500));
/// assert_eq!(total, Money::zero());
/// ```
#[inline]
pub fn cart_total(subtotal: Money, discount: Money) -> Money {
    (subtotal - discount).clamp_non_negative()
}

/// The part of `discount` that actually applies: `min(discount, subtotal)`,
/// never below zero.
#[inline]
pub fn effective_discount(subtotal: Money, discount: Money) -> Money {
    discount.min(subtotal).clamp_non_negative()
}

/// Change owed for a cash tender: `max(0, tendered - total)`.
#[inline]
pub fn change_due(total: Money, tendered: Money) -> Money {
    (tendered - total).clamp_non_negative()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unit_product(code: &str, price_cents: Option<i64>) -> Product {
        Product {
            id: format!("id-{}", code),
            code: code.to_string(),
            name: format!("Product {}", code),
            is_weighable: false,
            unit_price_cents: price_cents,
            price_per_gram_millicents: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn weighable_product(code: &str, millicents: Option<i64>) -> Product {
        Product {
            is_weighable: true,
            unit_price_cents: None,
            price_per_gram_millicents: millicents,
            ..unit_product(code, None)
        }
    }

    #[test]
    fn test_unit_priced_is_quantity_times_price() {
        let product = unit_product("A", Some(1099));
        for qty in [0_i64, 1, 2, 7, 999] {
            assert_eq!(
                line_subtotal(&product, qty, None).unwrap().cents(),
                qty * 1099
            );
        }
    }

    #[test]
    fn test_unit_priced_ignores_weight() {
        let product = unit_product("A", Some(500));
        assert_eq!(line_subtotal(&product, 3, Some(1234)).unwrap().cents(), 1500);
    }

    #[test]
    fn test_weighable_is_weight_times_rate() {
        // 49.90/kg
        let product = weighable_product("BUF", Some(4990));
        assert_eq!(line_subtotal(&product, 1, Some(1000)).unwrap().cents(), 4990);
        assert_eq!(line_subtotal(&product, 1, Some(2000)).unwrap().cents(), 9980);
        // quantity does not scale weighable lines
        assert_eq!(line_subtotal(&product, 5, Some(1000)).unwrap().cents(), 4990);
    }

    #[test]
    fn test_missing_unit_price() {
        let product = unit_product("A", None);
        assert_eq!(
            line_subtotal(&product, 1, None),
            Err(PricingError::MissingPrice {
                code: "A".to_string(),
                field: "unit_price"
            })
        );
    }

    #[test]
    fn test_missing_gram_price() {
        let product = weighable_product("BUF", None);
        assert!(matches!(
            line_subtotal(&product, 1, Some(300)),
            Err(PricingError::MissingPrice { field: "price_per_gram", .. })
        ));
    }

    #[test]
    fn test_weighable_without_weight() {
        let product = weighable_product("BUF", Some(4990));
        assert_eq!(
            line_subtotal(&product, 1, None),
            Err(PricingError::MissingWeight {
                code: "BUF".to_string()
            })
        );
    }

    #[test]
    fn test_oversized_line_is_rejected() {
        let product = unit_product("A", Some(i64::MAX / 2));
        assert_eq!(
            line_subtotal(&product, 3, None),
            Err(PricingError::AmountTooLarge {
                code: "A".to_string()
            })
        );

        // Fits in i64 but over the per-line ceiling.
        let product = unit_product("A", Some(MAX_LINE_SUBTOTAL_CENTS));
        assert!(line_subtotal(&product, 1, None).is_ok());
        assert!(line_subtotal(&product, 2, None).is_err());

        let product = weighable_product("BUF", Some(i64::MAX));
        assert!(matches!(
            line_subtotal(&product, 1, Some(100_000)),
            Err(PricingError::AmountTooLarge { .. })
        ));
    }

    #[test]
    fn test_cart_total_clamps() {
        let subtotal = Money::from_cents(2000);
        assert_eq!(cart_total(subtotal, Money::zero()).cents(), 2000);
        assert_eq!(cart_total(subtotal, Money::from_cents(500)).cents(), 1500);
        assert_eq!(cart_total(subtotal, Money::from_cents(2000)).cents(), 0);
        assert_eq!(cart_total(subtotal, Money::from_cents(2500)).cents(), 0);
    }

    #[test]
    fn test_effective_discount() {
        let subtotal = Money::from_cents(2000);
        assert_eq!(effective_discount(subtotal, Money::from_cents(500)).cents(), 500);
        assert_eq!(effective_discount(subtotal, Money::from_cents(2500)).cents(), 2000);
    }

    #[test]
    fn test_change_due() {
        let total = Money::from_cents(4350);
        assert_eq!(change_due(total, Money::from_cents(5000)).cents(), 650);
        assert_eq!(change_due(total, Money::from_cents(4000)).cents(), 0);
    }
}
