// SPDX-License-Identifier: MIT OR Apache-2.0
//! Exact rational timestamps.
//!
//! Timeline positions are compared for equality (a block must start exactly
//! where its predecessor ends), so times are kept as reduced fractions rather
//! than floats.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// A reduced fraction of seconds with a positive denominator.
///
/// The arithmetic operators panic when a result does not fit in `i64`, like
/// integer overflow in debug builds. Code that must not panic uses the
/// `checked_*` methods instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "(i64, i64)", into = "(i64, i64)")]
pub struct Rational {
    num: i64,
    den: i64,
}

impl Rational {
    /// Zero seconds
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// Create a rational from a numerator and denominator.
    ///
    /// # Panics
    ///
    /// Panics if `den` is zero or the reduced fraction does not fit in `i64`.
    pub fn new(num: i64, den: i64) -> Self {
        match Self::try_from((num, den)) {
            Ok(value) => value,
            Err(e) => panic!("{e}"),
        }
    }

    /// Create a rational from a whole number of seconds
    pub const fn from_integer(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    /// Numerator of the reduced fraction
    pub fn numer(&self) -> i64 {
        self.num
    }

    /// Denominator of the reduced fraction (always positive)
    pub fn denom(&self) -> i64 {
        self.den
    }

    /// Whether this value is exactly zero
    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    /// Whether this value is below zero
    pub fn is_negative(&self) -> bool {
        self.num < 0
    }

    /// Largest integer not greater than this value
    pub fn floor(&self) -> i64 {
        self.num.div_euclid(self.den)
    }

    /// Approximate value in seconds
    pub fn to_seconds(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// `self + rhs`, or `None` if the result does not fit
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let num = i128::from(self.num) * i128::from(rhs.den) + i128::from(rhs.num) * i128::from(self.den);
        Self::reduce(num, i128::from(self.den) * i128::from(rhs.den))
    }

    /// `self - rhs`, or `None` if the result does not fit
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let num = i128::from(self.num) * i128::from(rhs.den) - i128::from(rhs.num) * i128::from(self.den);
        Self::reduce(num, i128::from(self.den) * i128::from(rhs.den))
    }

    /// `self * rhs`, or `None` if the result does not fit
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        Self::reduce(
            i128::from(self.num) * i128::from(rhs.num),
            i128::from(self.den) * i128::from(rhs.den),
        )
    }

    /// `-self`, or `None` for a numerator of `i64::MIN`
    pub fn checked_neg(self) -> Option<Self> {
        Some(Self {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    /// Non-negative remainder of `self` divided by `modulus`.
    ///
    /// Returns `None` if `modulus` is not positive or the result does not fit.
    pub fn checked_rem_euclid(self, modulus: Self) -> Option<Self> {
        if modulus <= Self::ZERO {
            return None;
        }
        // floor(self / modulus), both denominators positive
        let quotient = (i128::from(self.num) * i128::from(modulus.den))
            .div_euclid(i128::from(modulus.num) * i128::from(self.den));
        let num = i128::from(self.num) * i128::from(modulus.den)
            - quotient * i128::from(modulus.num) * i128::from(self.den);
        Self::reduce(num, i128::from(self.den) * i128::from(modulus.den))
    }

    fn reduce(mut num: i128, mut den: i128) -> Option<Self> {
        if den < 0 {
            num = -num;
            den = -den;
        }
        let divisor = gcd(num.unsigned_abs(), den.unsigned_abs()).max(1) as i128;
        Some(Self {
            num: i64::try_from(num / divisor).ok()?,
            den: i64::try_from(den / divisor).ok()?,
        })
    }
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Default for Rational {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self::from_integer(value)
    }
}

impl TryFrom<(i64, i64)> for Rational {
    type Error = RationalError;

    fn try_from((num, den): (i64, i64)) -> Result<Self, Self::Error> {
        if den == 0 {
            return Err(RationalError::ZeroDenominator);
        }
        Self::reduce(i128::from(num), i128::from(den)).ok_or(RationalError::Overflow)
    }
}

impl From<Rational> for (i64, i64) {
    fn from(value: Rational) -> Self {
        (value.num, value.den)
    }
}

/// Error building a rational from raw parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RationalError {
    /// Denominator was zero
    #[error("rational denominator must not be zero")]
    ZeroDenominator,
    /// Reduced fraction does not fit in `i64`
    #[error("rational value out of range")]
    Overflow,
}

/// Error parsing a timestamp from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp `{0}`, expected `seconds`, `num/den` or a decimal")]
pub struct ParseRationalError(String);

impl FromStr for Rational {
    type Err = ParseRationalError;

    /// Accepts `5`, `1001/30000` and `2.5`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseRationalError(s.to_string());
        let text = s.trim();

        if let Some((num, den)) = text.split_once('/') {
            let num: i64 = num.trim().parse().map_err(|_| invalid())?;
            let den: i64 = den.trim().parse().map_err(|_| invalid())?;
            return Self::try_from((num, den)).map_err(|_| invalid());
        }

        if let Some((whole, fraction)) = text.split_once('.') {
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let den = u32::try_from(fraction.len())
                .ok()
                .and_then(|digits| 10i64.checked_pow(digits))
                .ok_or_else(invalid)?;
            let negative = whole.starts_with('-');
            let whole: i64 = match whole {
                "" | "-" => 0,
                _ => whole.parse().map_err(|_| invalid())?,
            };
            let fraction: i64 = fraction.parse().map_err(|_| invalid())?;
            let fraction = Self::try_from((fraction, den)).map_err(|_| invalid())?;
            let magnitude = whole
                .checked_abs()
                .map(Self::from_integer)
                .and_then(|whole| whole.checked_add(fraction))
                .ok_or_else(invalid)?;
            return if negative {
                magnitude.checked_neg().ok_or_else(invalid)
            } else {
                Ok(magnitude)
            };
        }

        text.parse().map(Self::from_integer).map_err(|_| invalid())
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.num) * i128::from(other.den);
        let rhs = i128::from(other.num) * i128::from(self.den);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn overflow(op: &str) -> ! {
    panic!("rational {op} overflowed; use the checked_* methods to handle this")
}

impl Add for Rational {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked_add(rhs).unwrap_or_else(|| overflow("addition"))
    }
}

impl Sub for Rational {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.checked_sub(rhs).unwrap_or_else(|| overflow("subtraction"))
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        self.checked_neg().unwrap_or_else(|| overflow("negation"))
    }
}

impl Mul for Rational {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.checked_mul(rhs).unwrap_or_else(|| overflow("multiplication"))
    }
}

impl AddAssign for Rational {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let r = Rational::new(4, -8);
        assert_eq!(r.numer(), -1);
        assert_eq!(r.denom(), 2);
        assert_eq!(Rational::new(0, 7), Rational::ZERO);
    }

    #[test]
    fn test_exact_arithmetic() {
        let third = Rational::new(1, 3);
        assert_eq!(third + third + third, Rational::from_integer(1));
        assert_eq!(Rational::new(1, 2) - Rational::new(1, 3), Rational::new(1, 6));
        assert_eq!(Rational::new(2, 3) * Rational::new(3, 4), Rational::new(1, 2));
    }

    #[test]
    fn test_ordering() {
        assert!(Rational::new(1, 3) < Rational::new(1, 2));
        assert!(Rational::new(-1, 2) < Rational::ZERO);
        assert_eq!(Rational::new(7, 2).floor(), 3);
        assert_eq!(Rational::new(-1, 2).floor(), -1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Rational::from_integer(5).to_string(), "5");
        assert_eq!(Rational::new(1001, 30000).to_string(), "1001/30000");
    }

    #[test]
    fn test_parse() {
        assert_eq!("5".parse::<Rational>().unwrap(), Rational::from_integer(5));
        assert_eq!(" 1001/30000 ".parse::<Rational>().unwrap(), Rational::new(1001, 30000));
        assert_eq!("2.5".parse::<Rational>().unwrap(), Rational::new(5, 2));
        assert_eq!("-0.25".parse::<Rational>().unwrap(), Rational::new(-1, 4));
        assert!("1/0".parse::<Rational>().is_err());
        assert!("abc".parse::<Rational>().is_err());
        assert!("1.".parse::<Rational>().is_err());
    }

    #[test]
    fn test_deserialize_rejects_zero_denominator() {
        let parsed: Rational = ron::from_str("(3, 6)").unwrap();
        assert_eq!(parsed, Rational::new(1, 2));
        assert!(ron::from_str::<Rational>("(1, 0)").is_err());
    }

    #[test]
    fn test_overflow_is_reported() {
        let max = Rational::from_integer(i64::MAX);
        assert_eq!(max.checked_add(Rational::from_integer(1)), None);
        assert_eq!(Rational::from_integer(i64::MIN).checked_neg(), None);
        assert_eq!(
            Rational::new(1, i64::MAX).checked_add(Rational::new(1, i64::MAX - 1)),
            None
        );
        assert_eq!(Rational::try_from((1, i64::MIN)), Err(RationalError::Overflow));
        assert_eq!(Rational::try_from((1, 0)), Err(RationalError::ZeroDenominator));
        assert!("99999999999999999999/2".parse::<Rational>().is_err());
        // Values that reduce back into range stay exact
        assert_eq!(
            Rational::new(i64::MAX, 2).checked_mul(Rational::new(2, i64::MAX)),
            Some(Rational::from_integer(1))
        );
    }

    #[test]
    #[should_panic(expected = "rational negation overflowed")]
    fn test_operator_overflow_panics() {
        let _ = -Rational::from_integer(i64::MIN);
    }

    #[test]
    fn test_rem_euclid() {
        let ten = Rational::from_integer(10);
        assert_eq!(Rational::from_integer(25).checked_rem_euclid(ten), Some(Rational::from_integer(5)));
        assert_eq!(Rational::new(-1, 2).checked_rem_euclid(ten), Some(Rational::new(19, 2)));
        assert_eq!(Rational::new(7, 3).checked_rem_euclid(Rational::new(1, 2)), Some(Rational::new(1, 3)));
        assert_eq!(ten.checked_rem_euclid(Rational::ZERO), None);
    }
}
