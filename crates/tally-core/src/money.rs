//! # Money Module
//!
//! Fixed-point monetary values, tax rates and weights.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 + 0.2 = 0.30000000000000004  ❌                                    │
//! │  Scanning the same item 10,000 times drifts the subtotal.               │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Every amount is an i64 count of the smallest currency unit.          │
//! │    Rounding happens exactly twice per sale: at the tax step and when    │
//! │    a weighed price is derived. Never line by line.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{Money, TaxRate};
//!
//! let price = Money::from_minor(12_000);
//! let tax = price.calculate_tax(TaxRate::from_bps(1100)); // 11%
//! assert_eq!(tax.minor(), 1_320);
//! assert_eq!(price.format_grouped('.'), "12.000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: a discount line is rendered as a negative amount
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer**: cart snapshots stay readable
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
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
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax with round-half-up to the smallest unit.
    ///
    /// ## Implementation
    /// Integer math in i128: `(amount * bps + 5000) / 10000`.
    /// The +5000 is the half step (5000/10000 = 0.5). Negative amounts
    /// round half away from zero so a refund mirrors its sale.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::money::{Money, TaxRate};
    ///
    /// // 10,005 at 10% = 1,000.5 → 1,001
    /// let tax = Money::from_minor(10_005).calculate_tax(TaxRate::from_bps(1000));
    /// assert_eq!(tax.minor(), 1_001);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money(round_half_up_div(
            self.0 as i128 * rate.bps() as i128,
            10_000,
        ))
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Price of `weight` when this value is the price per kilogram,
    /// rounded half up.
    ///
    /// ```rust
    /// use tally_core::money::{Money, Weight};
    ///
    /// let per_kg = Money::from_minor(12_000);
    /// assert_eq!(per_kg.multiply_weight(Weight::from_grams(500)).minor(), 6_000);
    /// ```
    pub fn multiply_weight(&self, weight: Weight) -> Money {
        Money(round_half_up_div(
            self.0 as i128 * weight.grams() as i128,
            1_000,
        ))
    }

    /// Formats the value with a thousands separator and no decimal digits.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// assert_eq!(Money::from_minor(1_234_567).format_grouped(','), "1,234,567");
    /// assert_eq!(Money::from_minor(-5_000).format_grouped('.'), "-5.000");
    /// assert_eq!(Money::from_minor(999).format_grouped('.'), "999");
    /// ```
    pub fn format_grouped(&self, separator: char) -> String {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
        if self.0 < 0 {
            grouped.push('-');
        }
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(separator);
            }
            grouped.push(ch);
        }
        grouped
    }
}

/// Divides with round-half-up (half away from zero for negatives).
/// Results outside `i64` saturate.
fn round_half_up_div(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };
    i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}

/// Plain integer display, for logs and error messages.
///
/// Use [`Money::format_grouped`] for anything printed for a customer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
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

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate in basis points (1 bps = 0.01%).
///
/// 1100 bps = 11%. The rate is always an explicit input to pricing; there is
/// no built-in jurisdiction default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

// =============================================================================
// Weight
// =============================================================================

/// A scale reading in grams.
///
/// Weighed products carry a price per kilogram; keeping the weight in
/// integer grams keeps the line price derivation exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Weight(u32);

impl Weight {
    #[inline]
    pub const fn from_grams(grams: u32) -> Self {
        Weight(grams)
    }

    #[inline]
    pub const fn grams(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

/// Kilograms with trailing zeros trimmed: `0.5 kg`, `1.25 kg`, `2 kg`.
impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kg = self.0 / 1000;
        let grams = self.0 % 1000;
        if grams == 0 {
            return write!(f, "{} kg", kg);
        }
        let frac = format!("{:03}", grams);
        write!(f, "{}.{} kg", kg, frac.trim_end_matches('0'))
    }
}

/// Parses a decimal kilogram reading such as `0.5` or `1.250`.
///
/// At most three decimal places (gram resolution) are accepted.
impl FromStr for Weight {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "weight".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim().trim_end_matches("kg").trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("expected a number of kilograms"));
        }
        if frac.len() > 3 {
            return Err(invalid("at most 3 decimal places"));
        }
        if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a number of kilograms"));
        }

        let kg: u32 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("weight too large"))?
        };
        let grams: u32 = if frac.is_empty() {
            0
        } else {
            format!("{:0<3}", frac)
                .parse()
                .map_err(|_| invalid("expected a number of kilograms"))?
        };

        kg.checked_mul(1000)
            .and_then(|g| g.checked_add(grams))
            .map(Weight)
            .ok_or_else(|| invalid("weight too large"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((a - b).minor(), 500);
        assert_eq!((a * 3).minor(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 2000);
    }

    #[test]
    fn test_tax_rounds_half_up() {
        // 10,005 × 10% = 1,000.5 → 1,001
        let tax = Money::from_minor(10_005).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.minor(), 1_001);

        // 10,004 × 10% = 1,000.4 → 1,000
        let tax = Money::from_minor(10_004).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.minor(), 1_000);

        // Half on an even digit still rounds up (not bankers rounding)
        // 25 × 10% = 2.5 → 3
        let tax = Money::from_minor(25).calculate_tax(TaxRate::from_bps(1000));
        assert_eq!(tax.minor(), 3);
    }

    #[test]
    fn test_tax_on_large_amount_does_not_overflow() {
        let amount = Money::from_minor(i64::MAX / 2);
        let tax = amount.calculate_tax(TaxRate::from_bps(1100));
        assert!(tax.is_positive());
    }

    #[test]
    fn test_multiply_weight() {
        let per_kg = Money::from_minor(12_000);
        assert_eq!(per_kg.multiply_weight(Weight::from_grams(500)).minor(), 6_000);
        assert_eq!(per_kg.multiply_weight(Weight::from_grams(1_250)).minor(), 15_000);

        // 333 × 0.005 = 1.665 → 2
        let odd = Money::from_minor(333);
        assert_eq!(odd.multiply_weight(Weight::from_grams(5)).minor(), 2);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(Money::from_minor(0).format_grouped('.'), "0");
        assert_eq!(Money::from_minor(100).format_grouped('.'), "100");
        assert_eq!(Money::from_minor(1_000).format_grouped('.'), "1.000");
        assert_eq!(Money::from_minor(100_000).format_grouped('.'), "100.000");
        assert_eq!(Money::from_minor(1_234_567).format_grouped(','), "1,234,567");
        assert_eq!(Money::from_minor(-12_500).format_grouped('.'), "-12.500");
    }

    #[test]
    fn test_tax_rate_display() {
        assert_eq!(TaxRate::from_bps(1100).to_string(), "11%");
        assert_eq!(TaxRate::from_bps(825).to_string(), "8.25%");
        assert_eq!(TaxRate::from_bps(50).to_string(), "0.50%");
    }

    #[test]
    fn test_weight_parse() {
        assert_eq!("0.5".parse::<Weight>().unwrap(), Weight::from_grams(500));
        assert_eq!("1.25".parse::<Weight>().unwrap(), Weight::from_grams(1_250));
        assert_eq!("2".parse::<Weight>().unwrap(), Weight::from_grams(2_000));
        assert_eq!(".75".parse::<Weight>().unwrap(), Weight::from_grams(750));
        assert_eq!("0.125 kg".parse::<Weight>().unwrap(), Weight::from_grams(125));

        assert!("".parse::<Weight>().is_err());
        assert!("abc".parse::<Weight>().is_err());
        assert!("-1".parse::<Weight>().is_err());
        assert!("0.0001".parse::<Weight>().is_err());
    }

    #[test]
    fn test_weight_display() {
        assert_eq!(Weight::from_grams(500).to_string(), "0.5 kg");
        assert_eq!(Weight::from_grams(1_250).to_string(), "1.25 kg");
        assert_eq!(Weight::from_grams(2_000).to_string(), "2 kg");
        assert_eq!(Weight::from_grams(5).to_string(), "0.005 kg");
    }
}
