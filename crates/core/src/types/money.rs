//! Fixed-point money and discount types.
//!
//! All monetary amounts are `rust_decimal` values, never binary floating
//! point, so cart totals accumulate exactly. Wire formats carry integer
//! minor units (cents); rounding to two fraction digits happens only at the
//! display/minor-unit boundary and uses round-half-even.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing money types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    /// Discount percentage outside the 0-100 range.
    #[error("discount percent must be between 0 and 100, got {0}")]
    InvalidPercent(Decimal),
}

/// A decimal currency amount.
///
/// The amount is kept at full precision through arithmetic; use
/// [`Money::to_minor_units`] or [`fmt::Display`] to round for the final
/// charge or for presentation. Both round half-even.
///
/// ## Examples
///
/// ```
/// use kiosk_core::Money;
///
/// let unit = Money::from_minor_units(10_000); // $100.00
/// assert_eq!(unit.times(2).to_string(), "$200.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a `Money` from integer minor units (cents).
    #[must_use]
    pub fn from_minor_units(minor: i64) -> Self {
        Self(Decimal::new(minor, 2))
    }

    /// Create a `Money` from whole currency units (dollars).
    #[must_use]
    pub fn from_major_units(major: i64) -> Self {
        Self(Decimal::from(major))
    }

    /// Create a `Money` from a raw decimal amount.
    #[must_use]
    pub const fn from_decimal(amount: Decimal) -> Self {
        Self(amount)
    }

    /// The full-precision decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Round to integer minor units (cents) with round-half-even.
    ///
    /// Saturates at `i64::MAX` if the amount does not fit, which no real
    /// cart total will reach.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        (rounded * Decimal::ONE_HUNDRED)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Apply a percentage discount: `amount * (1 - percent / 100)`.
    #[must_use]
    pub fn percent_off(&self, discount: DiscountPercent) -> Self {
        Self(self.0 * (Decimal::ONE - discount.as_decimal() / Decimal::ONE_HUNDRED))
    }

    /// Multiply by a quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    /// Formats as `$x.yz`, rounding to two fraction digits half-even.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        write!(f, "${rounded:.2}")
    }
}

/// A validated discount percentage in the range 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct DiscountPercent(Decimal);

impl DiscountPercent {
    /// No discount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a discount percentage.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidPercent`] if `percent` is negative or
    /// greater than 100.
    pub fn new(percent: Decimal) -> Result<Self, MoneyError> {
        if percent.is_sign_negative() || percent > Decimal::ONE_HUNDRED {
            return Err(MoneyError::InvalidPercent(percent));
        }
        Ok(Self(percent))
    }

    /// Create a discount from a whole-number percentage (e.g., `20` for 20%).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidPercent`] if `percent` is greater
    /// than 100.
    pub fn from_whole(percent: u8) -> Result<Self, MoneyError> {
        Self::new(Decimal::from(percent))
    }

    /// The percentage as a decimal (e.g., `20` for 20%).
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for DiscountPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_unit_round_trip() {
        let price = Money::from_minor_units(65_200);
        assert_eq!(price.amount(), Decimal::new(652, 0));
        assert_eq!(price.to_minor_units(), 65_200);
    }

    #[test]
    fn test_percent_off_exact() {
        // $652.00 at 20% off is exactly $521.60
        let price = Money::from_major_units(652);
        let discounted = price.percent_off(DiscountPercent::from_whole(20).unwrap());
        assert_eq!(discounted.to_minor_units(), 52_160);
        assert_eq!(discounted.to_string(), "$521.60");
    }

    #[test]
    fn test_display_rounds_half_even() {
        // Exactly representable midpoints round to the even cent.
        let low = Money::from_decimal(Decimal::new(125, 3)); // 0.125
        assert_eq!(low.to_string(), "$0.12");
        assert_eq!(low.to_minor_units(), 12);

        let high = Money::from_decimal(Decimal::new(135, 3)); // 0.135
        assert_eq!(high.to_string(), "$0.14");
        assert_eq!(high.to_minor_units(), 14);
    }

    #[test]
    fn test_display_pads_to_two_digits() {
        assert_eq!(Money::from_major_units(180).to_string(), "$180.00");
        assert_eq!(Money::from_minor_units(50).to_string(), "$0.50");
    }

    #[test]
    fn test_sum_accumulates_exactly() {
        let total: Money = (0..100).map(|_| Money::from_minor_units(10)).sum();
        assert_eq!(total, Money::from_major_units(10));
    }

    #[test]
    fn test_discount_bounds() {
        assert!(DiscountPercent::new(Decimal::ONE_HUNDRED).is_ok());
        assert!(DiscountPercent::new(Decimal::ZERO).is_ok());
        assert!(DiscountPercent::new(Decimal::new(1001, 1)).is_err());
        assert!(DiscountPercent::new(Decimal::new(-1, 0)).is_err());
    }
}
