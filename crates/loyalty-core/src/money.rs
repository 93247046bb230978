//! # Money Module
//!
//! Provides the `Money` and `ExactMoney` types for handling monetary values.
//!
//! ## Two Precisions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Money       i64 cents          What gets stored and displayed          │
//! │  ExactMoney  i64 micro-units    What the ledger calculates with         │
//! │                                                                         │
//! │  A 15% discount on $10.99 is $1.6485. The ledger keeps all of it:       │
//! │    ExactMoney(1_648_500)  → round_to_cents() → Money(165) → "$1.65"     │
//! │                                                                         │
//! │  Final totals are computed from ExactMoney and rounded ONCE, so         │
//! │  per-step display rounding never leaks into the total.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use loyalty_core::money::{ExactMoney, Money};
//!
//! let price = Money::from_cents(1099); // $10.99
//! let exact = ExactMoney::from(price);
//! assert_eq!(exact.micros(), 10_990_000);
//! assert_eq!(exact.round_to_cents(), price);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};
use ts_rs::TS;

/// Micro-units in one cent.
pub const MICROS_PER_CENT: i64 = 10_000;

/// Micro-units in one major currency unit (one dollar).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents for USD).
///
/// Signed: refunds and over-redeemed bills produce negative values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the value, or zero if it is negative.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Line total for `qty` units at this price, saturating at the `i64`
    /// range. Validation rejects bills that get anywhere near it.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

/// Shows money as `$10.99` / `-$5.50`.
///
/// Dashboards localise on their side; this is the two-decimal form used in
/// logs, receipts and toasts.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:02}", cents / 100, cents % 100)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
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
        iter.fold(Money::zero(), |acc, m| Money(acc.0.saturating_add(m.0)))
    }
}

// =============================================================================
// ExactMoney Type
// =============================================================================

/// A full-precision monetary value in micro-units (1/1,000,000 of a dollar).
///
/// ## Why Micro-Units?
/// Every ledger rate resolves exactly at this scale:
/// - percentage discounts: `cents × basis_points` micro-units
/// - Convention A point values are expressed in micro-units per point
/// - Convention B divides by points-per-dollar and truncates at one micro-unit
///
/// An `i64` of micro-units covers ±9.2 trillion dollars.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct ExactMoney(i64);

impl ExactMoney {
    #[inline]
    pub const fn from_micros(micros: i64) -> Self {
        ExactMoney(micros)
    }

    /// Builds a value from an `i128` intermediate, saturating at the `i64` range.
    pub(crate) fn from_wide(micros: i128) -> Self {
        ExactMoney(micros.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }

    #[inline]
    pub const fn micros(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        ExactMoney(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            ExactMoney(0)
        } else {
            ExactMoney(self.0)
        }
    }

    /// Rounds to whole cents, half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use loyalty_core::money::ExactMoney;
    ///
    /// assert_eq!(ExactMoney::from_micros(1_648_500).round_to_cents().cents(), 165);
    /// assert_eq!(ExactMoney::from_micros(-15_000).round_to_cents().cents(), -2);
    /// ```
    pub const fn round_to_cents(&self) -> Money {
        let whole = self.0 / MICROS_PER_CENT;
        let rest = self.0 % MICROS_PER_CENT;
        if rest.abs() * 2 >= MICROS_PER_CENT {
            Money::from_cents(whole + self.0.signum())
        } else {
            Money::from_cents(whole)
        }
    }

    /// Truncates to whole major units (dollars), toward zero.
    #[inline]
    pub const fn whole_units(&self) -> i64 {
        self.0 / MICROS_PER_UNIT
    }
}

impl From<Money> for ExactMoney {
    fn from(money: Money) -> Self {
        ExactMoney::from_wide(money.cents() as i128 * MICROS_PER_CENT as i128)
    }
}

/// Displays the value rounded to cents.
impl fmt::Display for ExactMoney {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.round_to_cents().fmt(f)
    }
}

impl Add for ExactMoney {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        ExactMoney(self.0.saturating_add(other.0))
    }
}

impl Sub for ExactMoney {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        ExactMoney(self.0.saturating_sub(other.0))
    }
}

impl Neg for ExactMoney {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        ExactMoney(self.0.saturating_neg())
    }
}

// =============================================================================
// Point Formatting
// =============================================================================

/// Formats a point count with thousands separators: `12,500`.
///
/// ## Example
/// ```rust
/// use loyalty_core::money::format_points;
///
/// assert_eq!(format_points(1_234_567), "1,234,567");
/// assert_eq!(format_points(650), "650");
/// ```
pub fn format_points(points: u64) -> String {
    let digits = points.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let latte = Money::from_cents(475);
        assert_eq!(latte.multiply_quantity(3).cents(), 1425);
        assert_eq!(latte.multiply_quantity(0), Money::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-1500)), "-$15.00");
        assert_eq!(format!("{}", Money::from_cents(-5)), "-$0.05");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.min(b), b);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-1).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(7).clamp_non_negative().cents(), 7);
        assert_eq!(
            ExactMoney::from_micros(-1).clamp_non_negative(),
            ExactMoney::zero()
        );
    }

    #[test]
    fn test_exact_from_money_is_lossless() {
        let money = Money::from_cents(-4321);
        let exact = ExactMoney::from(money);
        assert_eq!(exact.micros(), -43_210_000);
        assert_eq!(exact.round_to_cents(), money);
    }

    #[test]
    fn test_round_to_cents_half_away_from_zero() {
        assert_eq!(ExactMoney::from_micros(4_999).round_to_cents().cents(), 0);
        assert_eq!(ExactMoney::from_micros(5_000).round_to_cents().cents(), 1);
        assert_eq!(ExactMoney::from_micros(-5_000).round_to_cents().cents(), -1);
        assert_eq!(ExactMoney::from_micros(-4_999).round_to_cents().cents(), 0);
        assert_eq!(ExactMoney::from_micros(1_648_500).round_to_cents().cents(), 165);
    }

    #[test]
    fn test_whole_units_truncates() {
        assert_eq!(ExactMoney::from_micros(6_990_000).whole_units(), 6);
        assert_eq!(ExactMoney::from_micros(999_999).whole_units(), 0);
    }

    #[test]
    fn test_from_wide_saturates() {
        assert_eq!(ExactMoney::from_wide(i128::MAX).micros(), i64::MAX);
        assert_eq!(ExactMoney::from_wide(i128::MIN).micros(), i64::MIN);
    }

    #[test]
    fn test_exact_display_rounds() {
        assert_eq!(ExactMoney::from_micros(10_000_000).to_string(), "$10.00");
        assert_eq!(ExactMoney::from_micros(-15_000_000).to_string(), "-$15.00");
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(0), "0");
        assert_eq!(format_points(999), "999");
        assert_eq!(format_points(1_000), "1,000");
        assert_eq!(format_points(12_500), "12,500");
        assert_eq!(format_points(1_234_567), "1,234,567");
    }

    #[test]
    fn test_large_amounts_saturate_instead_of_overflowing() {
        let huge = Money::from_cents(1_000_000_000_000_000);
        assert_eq!(ExactMoney::from(huge).micros(), i64::MAX);
        assert_eq!(ExactMoney::from(Money::from_cents(i64::MIN)).micros(), i64::MIN);

        let line = Money::from_cents(i64::MAX / 2);
        assert_eq!(line.multiply_quantity(3).cents(), i64::MAX);
        assert_eq!(line.checked_multiply_quantity(3), None);
        assert_eq!(line.checked_multiply_quantity(2), Some(Money::from_cents(i64::MAX - 1)));
        assert_eq!(line.checked_add(line).and_then(|two| two.checked_add(line)), None);

        let total: Money = vec![line, line, line].into_iter().sum();
        assert_eq!(total.cents(), i64::MAX);

        let max = ExactMoney::from_micros(i64::MAX);
        assert_eq!((max + max).micros(), i64::MAX);
        assert_eq!((-max - max).micros(), i64::MIN);
        assert_eq!((-ExactMoney::from_micros(i64::MIN)).micros(), i64::MAX);
    }
}
