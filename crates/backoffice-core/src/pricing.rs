//! # Pricing
//!
//! Line amount resolution and refund proration.
//!
//! ## Line Amount
//! ```text
//! base      = unit_price × quantity
//! after_pct = base − round_half_up(base × percent_bps / 10000)
//! final     = max(0, after_pct − value)
//! ```
//!
//! Eligibility (promotion status, campaign window) is the caller's concern;
//! this module only does the arithmetic.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Discount terms of a promotion. Either part may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Discount {
    /// Percentage in basis points (1000 = 10%).
    pub percent_bps: Option<u32>,
    /// Fixed amount, applied after the percentage.
    pub value: Option<Money>,
}

impl Discount {
    /// True when the discount would not change any amount.
    pub fn is_empty(&self) -> bool {
        self.percent_bps.map_or(true, |bps| bps == 0)
            && self.value.map_or(true, |v| v.is_zero())
    }
}

/// Computes a line item's final amount.
///
/// Returns `None` when `unit_price × quantity` does not fit in an `i64`.
///
/// ## Example
/// ```rust
/// use backoffice_core::money::Money;
/// use backoffice_core::pricing::{resolve_line_amount, Discount};
///
/// let promo = Discount { percent_bps: Some(1000), value: Some(Money::from_cents(500)) };
/// // 3 × 10.00 = 30.00, minus 10% = 27.00, minus 5.00 = 22.00
/// let amount = resolve_line_amount(Money::from_cents(1000), 3, Some(&promo));
/// assert_eq!(amount, Some(Money::from_cents(2200)));
/// ```
pub fn resolve_line_amount(
    unit_price: Money,
    quantity: i64,
    discount: Option<&Discount>,
) -> Option<Money> {
    let base = unit_price.checked_multiply_quantity(quantity)?;
    let Some(discount) = discount else {
        return Some(base);
    };

    let after_percent = match discount.percent_bps {
        Some(bps) => base.apply_percentage_discount(bps),
        None => base,
    };

    Some(match discount.value {
        Some(value) => after_percent.saturating_sub_to_zero(value),
        None => after_percent.saturating_sub_to_zero(Money::zero()),
    })
}

/// Refund for returning `return_qty` units of an invoice line.
///
/// `already_returned` is the quantity refunded by earlier returns of the
/// same line. The refund is the difference of two cumulative floors:
///
/// ```text
/// refund = ⌊A·(R+q)/Q⌋ − ⌊A·R/Q⌋
/// ```
///
/// so partial refunds always add up to exactly `original_amount` once the
/// whole line has come back, and never more.
///
/// ## Example
/// ```rust
/// use backoffice_core::money::Money;
/// use backoffice_core::pricing::prorate_refund;
///
/// let amount = Money::from_cents(500);
/// assert_eq!(prorate_refund(amount, 5, 0, 2).cents(), 200);
/// ```
pub fn prorate_refund(
    original_amount: Money,
    original_qty: i64,
    already_returned: i64,
    return_qty: i64,
) -> Money {
    if original_qty <= 0 || return_qty <= 0 {
        return Money::zero();
    }
    let upto = (already_returned + return_qty).min(original_qty);
    let before = already_returned.clamp(0, original_qty);

    original_amount.scale_floor(upto, original_qty) - original_amount.scale_floor(before, original_qty)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(v: i64) -> Money {
        Money::from_cents(v)
    }

    #[test]
    fn test_no_promotion_is_base_amount() {
        assert_eq!(resolve_line_amount(cents(250), 4, None), Some(cents(1000)));
    }

    #[test]
    fn test_percent_only() {
        let promo = Discount {
            percent_bps: Some(2000),
            value: None,
        };
        assert_eq!(resolve_line_amount(cents(1000), 2, Some(&promo)), Some(cents(1600)));
    }

    #[test]
    fn test_value_only() {
        let promo = Discount {
            percent_bps: None,
            value: Some(cents(300)),
        };
        assert_eq!(resolve_line_amount(cents(1000), 1, Some(&promo)), Some(cents(700)));
    }

    #[test]
    fn test_percent_applied_before_value() {
        // value first would give (1000 - 100) * 0.5 = 450
        let promo = Discount {
            percent_bps: Some(5000),
            value: Some(cents(100)),
        };
        assert_eq!(resolve_line_amount(cents(1000), 1, Some(&promo)), Some(cents(400)));
    }

    #[test]
    fn test_discount_floors_at_zero() {
        let promo = Discount {
            percent_bps: Some(5000),
            value: Some(cents(10_000)),
        };
        assert_eq!(resolve_line_amount(cents(1000), 1, Some(&promo)), Some(cents(0)));
    }

    #[test]
    fn test_overflowing_line_is_rejected() {
        assert_eq!(resolve_line_amount(cents(i64::MAX / 10), 999, None), None);
    }

    #[test]
    fn test_empty_discount() {
        assert!(Discount::default().is_empty());
        assert!(!Discount {
            percent_bps: Some(1),
            value: None
        }
        .is_empty());
    }

    #[test]
    fn test_prorate_single_return() {
        assert_eq!(prorate_refund(cents(500), 5, 0, 2).cents(), 200);
    }

    #[test]
    fn test_prorate_partials_sum_to_original() {
        // 1000 over 3 units: 333 + 333 + 334
        let amount = cents(1000);
        let first = prorate_refund(amount, 3, 0, 1);
        let second = prorate_refund(amount, 3, 1, 1);
        let third = prorate_refund(amount, 3, 2, 1);
        assert_eq!(first.cents(), 333);
        assert_eq!(second.cents(), 333);
        assert_eq!(third.cents(), 334);
        assert_eq!((first + second + third).cents(), 1000);
    }

    #[test]
    fn test_prorate_never_exceeds_original() {
        let amount = cents(997);
        let mut refunded = Money::zero();
        let mut returned = 0;
        for qty in [2, 3, 1, 1] {
            refunded += prorate_refund(amount, 7, returned, qty);
            returned += qty;
            assert!(refunded <= amount);
        }
        assert_eq!(refunded, amount);
    }

    #[test]
    fn test_prorate_degenerate_inputs() {
        assert!(prorate_refund(cents(500), 0, 0, 1).is_zero());
        assert!(prorate_refund(cents(500), 5, 0, 0).is_zero());
        // over-return is capped at what is left
        assert_eq!(prorate_refund(cents(500), 5, 4, 3).cents(), 100);
    }
}
