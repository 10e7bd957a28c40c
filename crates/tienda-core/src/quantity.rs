//! # Quantity Module
//!
//! Stock and line quantities in thousandths of a unit.
//!
//! Most products are sold by the piece, but unit types include weight and
//! volume (kg, l), so the API reports stock like `12.5`. A `Quantity`
//! stores that as `12500` and never touches floating point after parsing.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use crate::money::{parse_scaled, scaled_from_f64, ParseAmountError};

const SCALE: u32 = 3;
const MILLI_PER_UNIT: i64 = 1000;

/// A quantity of product, in thousandths of its unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(i64);

impl Quantity {
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Whole units: `from_units(3)` is three pieces.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI_PER_UNIT)
    }

    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        scaled_from_f64(value, SCALE).map(Quantity)
    }

    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// True when the quantity has no fractional part.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % MILLI_PER_UNIT == 0
    }

    /// Decimal string used on the wire. Whole quantities have no decimals.
    pub fn to_decimal_string(&self) -> String {
        self.to_string()
    }

    /// Table form: whole quantities bare, fractional ones with exactly
    /// three decimals (`2.500`).
    pub fn to_fixed_string(&self) -> String {
        if self.is_whole() {
            return self.to_string();
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / MILLI_PER_UNIT).abs();
        let frac = (self.0 % MILLI_PER_UNIT).abs();
        format!("{}{}.{:03}", sign, whole, frac)
    }
}

/// Shortest decimal form: `3`, `2.5`, `0.005`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let whole = (self.0 / MILLI_PER_UNIT).abs();
        let frac = (self.0 % MILLI_PER_UNIT).abs();
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Quantity {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scaled(s, SCALE)
            .map(Quantity)
            .ok_or_else(|| ParseAmountError(s.to_string()))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0.saturating_sub(other.0))
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::zero(), Add::add)
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a quantity as number or string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        v.checked_mul(MILLI_PER_UNIT)
            .map(Quantity)
            .ok_or_else(|| E::custom("quantity out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        i64::try_from(v)
            .ok()
            .and_then(|v| v.checked_mul(MILLI_PER_UNIT))
            .map(Quantity)
            .ok_or_else(|| E::custom("quantity out of range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
        Quantity::from_f64(v).ok_or_else(|| E::custom("quantity out of range"))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Quantity, E> {
        Ok(Quantity::zero())
    }

    fn visit_none<E: de::Error>(self) -> Result<Quantity, E> {
        Ok(Quantity::zero())
    }
}
