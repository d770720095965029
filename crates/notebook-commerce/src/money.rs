//! Money type for representing monetary values.
//!
//! Uses cents-based integer representation to avoid floating-point
//! precision issues that plague monetary calculations. On the wire a
//! `Money` is a plain JSON number (`1899`, `49.99`), matching what the
//! storefront client sends and expects.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Number of minor units per major unit.
const CENTS_PER_UNIT: i64 = 100;

/// A monetary value in the store currency.
///
/// Amounts are stored in cents. Arithmetic saturates instead of wrapping so
/// aggregates over user input can never panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    /// Amount in cents.
    pub amount_cents: i64,
}

impl Money {
    /// Create a new Money value from cents.
    pub const fn new(amount_cents: i64) -> Self {
        Self { amount_cents }
    }

    /// Create a Money value from a decimal amount.
    ///
    /// ```
    /// use notebook_commerce::money::Money;
    /// let price = Money::from_decimal(49.99);
    /// assert_eq!(price.amount_cents, 4999);
    /// ```
    pub fn from_decimal(amount: f64) -> Self {
        Self::new((amount * CENTS_PER_UNIT as f64).round() as i64)
    }

    /// Create a value from whole currency units.
    pub const fn from_units(units: i64) -> Self {
        Self::new(units.saturating_mul(CENTS_PER_UNIT))
    }

    /// Zero.
    pub const fn zero() -> Self {
        Self::new(0)
    }

    /// Check if this is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_cents == 0
    }

    /// Check if this is positive.
    pub fn is_positive(&self) -> bool {
        self.amount_cents > 0
    }

    /// Check if this is negative.
    pub fn is_negative(&self) -> bool {
        self.amount_cents < 0
    }

    /// Convert to a decimal value.
    pub fn to_decimal(&self) -> f64 {
        self.amount_cents as f64 / CENTS_PER_UNIT as f64
    }

    /// Format as a display string with thousands separators (e.g., "$1,899.00").
    pub fn display(&self) -> String {
        let sign = if self.is_negative() { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        let units = abs / CENTS_PER_UNIT as u64;
        let cents = abs % CENTS_PER_UNIT as u64;
        format!("{}${}.{:02}", sign, group_thousands(units), cents)
    }

    /// Try to add another Money value, returning None on overflow.
    pub fn try_add(&self, other: &Money) -> Option<Money> {
        self.amount_cents.checked_add(other.amount_cents).map(Money::new)
    }

    /// Saturating addition.
    pub fn saturating_add(&self, other: &Money) -> Money {
        Money::new(self.amount_cents.saturating_add(other.amount_cents))
    }

    /// Saturating multiplication by a quantity.
    pub fn saturating_multiply(&self, factor: i64) -> Money {
        Money::new(self.amount_cents.saturating_mul(factor))
    }

    /// Calculate a percentage of this amount, rounded to the nearest cent.
    pub fn percentage(&self, percent: f64) -> Money {
        Money::new((self.amount_cents as f64 * percent / 100.0).round() as i64)
    }

    /// Price after taking `percent` off.
    ///
    /// A non-positive discount leaves the amount unchanged.
    pub fn discounted(&self, percent: f64) -> Money {
        if percent <= 0.0 {
            return *self;
        }
        Money::new((self.amount_cents as f64 * (1.0 - percent / 100.0)).round() as i64)
    }

    /// Sum an iterator of Money values, saturating on overflow.
    pub fn sum<'a>(iter: impl Iterator<Item = &'a Money>) -> Money {
        iter.fold(Money::zero(), |acc, m| acc.saturating_add(m))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        self.saturating_add(&other)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money::new(self.amount_cents.saturating_sub(other.amount_cents))
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, factor: i64) -> Money {
        self.saturating_multiply(factor)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.amount_cents % CENTS_PER_UNIT == 0 {
            serializer.serialize_i64(self.amount_cents / CENTS_PER_UNIT)
        } else {
            serializer.serialize_f64(self.to_decimal())
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        if !amount.is_finite() {
            return Err(serde::de::Error::custom("amount must be a finite number"));
        }
        Ok(Money::from_decimal(amount))
    }
}

fn group_thousands(mut n: u64) -> String {
    if n < 1000 {
        return n.to_string();
    }
    let mut groups = Vec::new();
    while n >= 1000 {
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    groups.push(n.to_string());
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_from_decimal() {
        assert_eq!(Money::from_decimal(49.99).amount_cents, 4999);
        assert_eq!(Money::from_decimal(1899.0).amount_cents, 189_900);
        assert_eq!(Money::from_units(50), Money::new(5000));
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::new(4999).display(), "$49.99");
        assert_eq!(Money::from_units(1_234_567).display(), "$1,234,567.00");
        assert_eq!(Money::new(-150).display(), "-$1.50");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_units(100);
        let b = Money::from_units(50);
        assert_eq!(a + b, Money::from_units(150));
        assert_eq!(a - b, Money::from_units(50));
        assert_eq!(a * 3, Money::from_units(300));
        assert_eq!(Money::new(i64::MAX) + Money::new(1), Money::new(i64::MAX));
        assert!(Money::new(i64::MAX).try_add(&Money::new(1)).is_none());
    }

    #[test]
    fn test_money_discount() {
        let price = Money::from_units(1899);
        assert_eq!(price.discounted(0.0), price);
        // 1899 * 0.86 = 1633.14
        assert_eq!(price.discounted(14.0), Money::new(163_314));
        assert_eq!(Money::from_units(100).percentage(19.0), Money::from_units(19));
    }

    #[test]
    fn test_money_json_shape() {
        assert_eq!(serde_json::to_string(&Money::from_units(1899)).unwrap(), "1899");
        assert_eq!(serde_json::to_string(&Money::new(4999)).unwrap(), "49.99");

        let parsed: Money = serde_json::from_str("1633.14").unwrap();
        assert_eq!(parsed.amount_cents, 163_314);
        let parsed: Money = serde_json::from_str("250").unwrap();
        assert_eq!(parsed, Money::from_units(250));
    }

    #[test]
    fn test_money_sum() {
        let values = [Money::from_units(200), Money::from_units(50)];
        assert_eq!(Money::sum(values.iter()), Money::from_units(250));
    }
}
