//! # Money Module
//!
//! Provides the `Money` type for monetary values in the smallest currency
//! unit. Prices, line amounts, invoice totals and refunds all flow through
//! this type.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  0.1 + 0.2 = 0.30000000000000004   (f64)                               │
//! │  10 + 20   = 30                    (i64 minor units)                   │
//! │                                                                         │
//! │  Refunds are prorated from stored invoice amounts; any float drift     │
//! │  would let the sum of refunds creep past the original amount.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use backoffice_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let line = price.checked_multiply_quantity(3);
//! assert_eq!(line, Some(Money::from_cents(3297)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (cents, or whole units for zero-decimal
/// currencies).
///
/// Signed so intermediate differences can be represented; persisted amounts
/// are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, or `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use backoffice_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.checked_multiply_quantity(3).map(|m| m.cents()), Some(897));
    /// assert!(Money::from_cents(i64::MAX).checked_multiply_quantity(2).is_none());
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds `other`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Applies a percentage discount given in basis points (1000 = 10%).
    ///
    /// The discount itself is rounded half-up, so a 10% discount on 5
    /// removes 1 (0.5 rounds up), leaving 4.
    ///
    /// ## Example
    /// ```rust
    /// use backoffice_core::money::Money;
    ///
    /// let subtotal = Money::from_cents(10_000);
    /// assert_eq!(subtotal.apply_percentage_discount(1000).cents(), 9_000);
    /// ```
    pub fn apply_percentage_discount(&self, discount_bps: u32) -> Money {
        // i128 so large amounts times 10000 cannot overflow
        let discount = (self.0 as i128 * discount_bps as i128 + 5000) / 10000;
        Money(self.0 - discount as i64)
    }

    /// Subtracts `other`, clamping the result at zero.
    #[inline]
    pub fn saturating_sub_to_zero(&self, other: Money) -> Money {
        Money((self.0 - other.0).max(0))
    }

    /// Returns `self × numerator / denominator`, rounded down.
    ///
    /// Returns zero when `denominator` is not positive.
    pub fn scale_floor(&self, numerator: i64, denominator: i64) -> Money {
        if denominator <= 0 {
            return Money::zero();
        }
        let scaled = (self.0 as i128 * numerator as i128).div_euclid(denominator as i128);
        Money(scaled as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Two-decimal rendering for logs. The API layer formats for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_multiply_quantity() {
        assert_eq!(Money::from_cents(100).checked_multiply_quantity(10), Some(Money::from_cents(1000)));
        assert_eq!(Money::from_cents(0).checked_multiply_quantity(5), Some(Money::zero()));
        assert_eq!(Money::from_cents(i64::MAX / 2).checked_multiply_quantity(3), None);
    }

    #[test]
    fn test_checked_add() {
        let a = Money::from_cents(250);
        assert_eq!(a.checked_add(Money::from_cents(750)), Some(Money::from_cents(1000)));
        assert_eq!(Money::from_cents(i64::MAX).checked_add(a), None);
    }

    #[test]
    fn test_percentage_discount_rounding() {
        // 10% of 5 = 0.5 → rounds up to 1
        assert_eq!(Money::from_cents(5).apply_percentage_discount(1000).cents(), 4);
        // 15% of 1999 = 299.85 → 300
        assert_eq!(Money::from_cents(1999).apply_percentage_discount(1500).cents(), 1699);
        // 100% leaves nothing
        assert_eq!(Money::from_cents(1234).apply_percentage_discount(10000).cents(), 0);
    }

    #[test]
    fn test_saturating_sub_to_zero() {
        let a = Money::from_cents(300);
        assert_eq!(a.saturating_sub_to_zero(Money::from_cents(100)).cents(), 200);
        assert_eq!(a.saturating_sub_to_zero(Money::from_cents(500)).cents(), 0);
    }

    #[test]
    fn test_scale_floor() {
        let amount = Money::from_cents(500);
        assert_eq!(amount.scale_floor(2, 5).cents(), 200);
        assert_eq!(Money::from_cents(11).scale_floor(1, 3).cents(), 3);
        assert_eq!(amount.scale_floor(1, 0).cents(), 0);
    }

    #[test]
    fn test_sum() {
        let total: Money = [100, 250, 650].iter().map(|m| Money::from_cents(*m)).sum();
        assert_eq!(total.cents(), 1000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_cents(7).to_string(), "0.07");
    }
}
