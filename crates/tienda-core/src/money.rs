//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  The REST API sends prices as JSON numbers ("10.5") in some            │
//! │  endpoints and as strings ("10.50") in others.                         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Both forms are parsed once at the boundary into i64 cents.          │
//! │    Every total in a draft is exact integer arithmetic.                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tienda_core::money::Money;
//! use tienda_core::quantity::Quantity;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price * Quantity::from_units(3); // $32.97
//! assert_eq!(line.cents(), 3297);
//! assert_eq!(line.to_string(), "$32.97");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::quantity::Quantity;

/// Cents per currency unit.
const SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values; totals can go below zero
///   when a general discount exceeds the subtotal
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Wire format**: decimal string (`"10.50"`), accepted back as either
///   a string or a JSON number
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  Product.price ──┬──► SaleLine.unit_price (locked at selection)         │
/// │                  │          │                                           │
/// │                  │          ▼                                           │
/// │                  │    unit_price × quantity − line discount             │
/// │                  │                                                      │
/// │                  └──► Displayed as "$10.99" in tables                   │
/// │                                                                         │
/// │  SaleDraft.subtotal − SaleDraft.discount ──► SaleDraft.total            │
/// │  Product.cost ──► OrderLine.unit_cost ──► PurchaseOrderDraft.total      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use tienda_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// ## Example
    /// ```rust
    /// use tienda_core::money::Money;
    ///
    /// let price = Money::from_major_minor(10, 99); // $10.99
    /// assert_eq!(price.cents(), 1099);
    ///
    /// let negative = Money::from_major_minor(-5, 50); // -$5.50
    /// assert_eq!(negative.cents(), -550);
    /// ```
    ///
    /// ## Note
    /// For negative amounts, only the major unit should be negative.
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Converts a JSON float into cents, rounding to the nearest cent.
    ///
    /// Only used at the deserialization boundary. Returns `None` for
    /// NaN, infinities and values that do not fit in i64 cents.
    pub fn from_f64(value: f64) -> Option<Self> {
        scaled_from_f64(value, SCALE).map(Money)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    ///
    /// ## Example
    /// ```rust
    /// use tienda_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).units(), 10);
    /// assert_eq!(Money::from_cents(-550).units(), -5);
    /// ```
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a whole number of units.
    ///
    /// ## Example
    /// ```rust
    /// use tienda_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Decimal string used on the wire: `"10.50"`, `"-5.00"`.
    ///
    /// Unlike `Display` there is no currency sign.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

// =============================================================================
// Decimal Parsing
// =============================================================================

/// Parses a plain decimal string into an integer scaled by `10^scale`.
///
/// Extra fractional digits are rounded half away from zero on the first
/// dropped digit: `parse_scaled("2.345", 2) == Some(235)`.
/// Accepts an optional leading sign and surrounding whitespace. Rejects
/// exponents, thousands separators and empty input.
pub(crate) fn parse_scaled(input: &str, scale: u32) -> Option<i64> {
    let s = input.trim();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let factor = 10i64.checked_pow(scale)?;
    let mut value: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse::<i64>().ok()?.checked_mul(factor)?
    };

    let frac = frac_part.as_bytes();
    let mut place = factor;
    for &b in frac.iter().take(scale as usize) {
        place /= 10;
        value = value.checked_add(i64::from(b - b'0') * place)?;
    }
    if let Some(&next) = frac.get(scale as usize) {
        if next >= b'5' {
            value = value.checked_add(1)?;
        }
    }

    Some(if negative { -value } else { value })
}

/// Converts a float into an integer scaled by `10^scale`, rounding half
/// away from zero.
pub(crate) fn scaled_from_f64(value: f64, scale: u32) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * 10f64.powi(scale as i32)).round();
    if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Error returned when a string is not a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal amount: {0:?}")]
pub struct ParseAmountError(pub String);

impl FromStr for Money {
    type Err = ParseAmountError;

    /// Accepts `"10.5"`, `"10.50"`, `"-3"` and a leading `$`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unsigned = trimmed.strip_prefix('$').unwrap_or(trimmed);
        parse_scaled(unsigned, SCALE)
            .map(Money)
            .ok_or_else(|| ParseAmountError(s.to_string()))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money the way tables and the confirmation banner do:
/// two decimals with a `$` sign.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.units().abs(), self.cents_part())
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(self.0.saturating_neg())
    }
}

/// Multiplication by a whole count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Price × quantity for weighed or counted goods.
///
/// Quantities are thousandths, so the product is rounded half away from
/// zero to the nearest cent: $1.99 × 0.333 kg = $0.66. Results beyond the
/// `i64` range clamp to its bounds.
impl Mul<Quantity> for Money {
    type Output = Self;

    fn mul(self, qty: Quantity) -> Self {
        let raw = self.0 as i128 * qty.milli() as i128;
        let rounded = if raw >= 0 {
            (raw + 500) / 1000
        } else {
            (raw - 500) / 1000
        };
        Money(i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX }))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Serde
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(100))
            .map(Money)
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Money::from_f64(v).ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.units(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((b - a).cents(), -500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_multiply_by_fractional_quantity_rounds_to_cent() {
        let per_kg = Money::from_cents(199);
        assert_eq!((per_kg * Quantity::from_milli(333)).cents(), 66);
        assert_eq!((per_kg * Quantity::from_milli(2500)).cents(), 498);
        assert_eq!((Money::from_cents(-199) * Quantity::from_milli(2500)).cents(), -498);
    }

    #[test]
    fn test_overflowing_arithmetic_clamps() {
        let huge = Money::from_cents(i64::MAX / 2);
        assert_eq!((huge * Quantity::from_units(3)).cents(), i64::MAX);
        assert_eq!((-huge * Quantity::from_units(3)).cents(), i64::MIN);
        assert_eq!((huge + huge + huge).cents(), i64::MAX);
        assert_eq!((-huge - huge - huge).cents(), i64::MIN);
        assert_eq!((huge * 4).cents(), i64::MAX);

        let mut total = huge;
        total += huge;
        total += huge;
        assert_eq!(total.cents(), i64::MAX);
    }

    #[test]
    fn test_null_amount_is_zero() {
        let amount: Money = serde_json::from_str("null").unwrap();
        assert_eq!(amount, Money::zero());
        let amount: Option<Money> = serde_json::from_str("null").unwrap();
        assert_eq!(amount, None);
    }

    #[test]
    fn test_parse_scaled() {
        assert_eq!(parse_scaled("10", 2), Some(1000));
        assert_eq!(parse_scaled("10.5", 2), Some(1050));
        assert_eq!(parse_scaled("10.50", 2), Some(1050));
        assert_eq!(parse_scaled(".5", 2), Some(50));
        assert_eq!(parse_scaled("2.345", 2), Some(235));
        assert_eq!(parse_scaled("2.344", 2), Some(234));
        assert_eq!(parse_scaled("-2.345", 2), Some(-235));
        assert_eq!(parse_scaled(" 7 ", 3), Some(7000));
        assert_eq!(parse_scaled("", 2), None);
        assert_eq!(parse_scaled("-", 2), None);
        assert_eq!(parse_scaled("1e3", 2), None);
        assert_eq!(parse_scaled("1,000", 2), None);
    }

    #[test]
    fn test_from_str_accepts_currency_sign() {
        assert_eq!("$10.99".parse::<Money>(), Ok(Money::from_cents(1099)));
        assert!("abc".parse::<Money>().is_err());
    }

    #[test]
    fn test_serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(1050)).unwrap();
        assert_eq!(json, "\"10.50\"");
        let json = serde_json::to_string(&Money::from_cents(-5)).unwrap();
        assert_eq!(json, "\"-0.05\"");
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let from_int: Money = serde_json::from_str("12").unwrap();
        let from_float: Money = serde_json::from_str("12.5").unwrap();
        let from_str: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(from_int.cents(), 1200);
        assert_eq!(from_float.cents(), 1250);
        assert_eq!(from_str.cents(), 1250);

        // 0.1 + 0.2 style noise is absorbed by rounding to the cent
        let noisy: Money = serde_json::from_str("0.30000000000000004").unwrap();
        assert_eq!(noisy.cents(), 30);
    }
}
