/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Non-negative fixed point decimal with 18 fractional digits.
//!
//! Prices (base fee, minimum gas price) and multipliers (minimum gas multiplier) are rational
//! quantities whose arithmetic must produce identical results on every node. [Dec] stores the
//! value scaled by 10^18 in a 256-bit unsigned integer. Multiplication and division round half
//! to even on the last digit; [Dec::checked_quo_int] and [Dec::truncate_int] truncate.

use std::{fmt, str::FromStr};

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional decimal digits.
pub const PRECISION: usize = 18;

const ONE_RAW: u64 = 1_000_000_000_000_000_000;

#[inline]
fn precision_reuse() -> U256 {
    U256::from(ONE_RAW)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Dec(U256);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDecError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid decimal string: {0}")]
    Invalid(String),
    #[error("too many fractional digits: {0}")]
    TooPrecise(String),
    #[error("decimal out of range: {0}")]
    Overflow(String),
}

impl Dec {
    pub const ZERO: Dec = Dec(U256::ZERO);

    pub fn one() -> Self {
        Self(precision_reuse())
    }

    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> U256 {
        self.0
    }

    pub fn from_u64(value: u64) -> Self {
        // u64::MAX * 10^18 < 2^128, never overflows
        Self(U256::from(value) * precision_reuse())
    }

    pub fn from_int(value: U256) -> Option<Self> {
        value.checked_mul(precision_reuse()).map(Self)
    }

    /// `numerator / denominator`, rounded half to even. None if the denominator is zero.
    pub fn from_ratio(numerator: u64, denominator: u64) -> Option<Self> {
        Self::from_u64(numerator).checked_quo(Self::from_u64(denominator))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let product = self.0.checked_mul(other.0)?;
        Some(Self(chop_precision_and_round(product)))
    }

    pub fn checked_mul_int(self, int: U256) -> Option<Self> {
        self.0.checked_mul(int).map(Self)
    }

    pub fn checked_quo(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        let scaled = self
            .0
            .checked_mul(precision_reuse())?
            .checked_mul(precision_reuse())?;
        Some(Self(chop_precision_and_round(scaled / other.0)))
    }

    /// Division by an integer, truncating the remainder.
    pub fn checked_quo_int(self, int: U256) -> Option<Self> {
        if int.is_zero() {
            return None;
        }
        Some(Self(self.0 / int))
    }

    pub fn truncate_int(&self) -> U256 {
        self.0 / precision_reuse()
    }

    pub fn ceil_int(&self) -> U256 {
        let (quo, rem) = self.0.div_rem(precision_reuse());
        if rem.is_zero() {
            quo
        } else {
            quo + U256::from(1u8)
        }
    }

    /// Truncated integer part as u64, None if it does not fit.
    pub fn truncate_u64(&self) -> Option<u64> {
        u64::try_from(self.truncate_int()).ok()
    }
}

/// Removes the 18 extra digits of a product, rounding half to even.
fn chop_precision_and_round(value: U256) -> U256 {
    let (quo, rem) = value.div_rem(precision_reuse());
    if rem.is_zero() {
        return quo;
    }
    let half = U256::from(ONE_RAW / 2);
    match rem.cmp(&half) {
        std::cmp::Ordering::Less => quo,
        std::cmp::Ordering::Greater => quo + U256::from(1u8),
        std::cmp::Ordering::Equal => {
            if quo.bit(0) {
                quo + U256::from(1u8)
            } else {
                quo
            }
        }
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (int, frac) = self.0.div_rem(precision_reuse());
        let frac = frac.to_string();
        write!(f, "{}.{}{}", int, "0".repeat(PRECISION - frac.len()), frac)
    }
}

impl FromStr for Dec {
    type Err = ParseDecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseDecError::Empty);
        }
        let (int_part, frac_part) = match s.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (s, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ParseDecError::Invalid(s.to_string()));
        }
        if frac_part.len() > PRECISION {
            return Err(ParseDecError::TooPrecise(s.to_string()));
        }
        let padded = format!("{int_part}{frac_part}{}", "0".repeat(PRECISION - frac_part.len()));
        U256::from_str_radix(&padded, 10)
            .map(Self)
            .map_err(|_| ParseDecError::Overflow(s.to_string()))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let half: Dec = "0.5".parse().unwrap();
        assert_eq!(half, Dec::from_ratio(1, 2).unwrap());
        assert_eq!(half.to_string(), "0.500000000000000000");
        assert_eq!(Dec::from_u64(7).to_string(), "7.000000000000000000");
        assert!("1.0000000000000000001".parse::<Dec>().is_err());
        assert!("-1".parse::<Dec>().is_err());
        assert!(".5".parse::<Dec>().is_err());
    }

    #[test]
    fn arithmetic_rounds_half_to_even() {
        // 0.000000000000000001 * 0.5 = 0.0000000000000000005 -> rounds to even (0)
        let tiny = Dec::from_raw(U256::from(1u8));
        let half = Dec::from_ratio(1, 2).unwrap();
        assert_eq!(tiny.checked_mul(half).unwrap(), Dec::ZERO);
        // 0.000000000000000003 * 0.5 -> 1.5 ulp -> rounds to 2 ulp
        let three = Dec::from_raw(U256::from(3u8));
        assert_eq!(three.checked_mul(half).unwrap(), Dec::from_raw(U256::from(2u8)));
        // 2 / 3
        let two_thirds = Dec::from_u64(2).checked_quo(Dec::from_u64(3)).unwrap();
        assert_eq!(two_thirds.to_string(), "0.666666666666666667");
    }

    #[test]
    fn integer_conversions() {
        let d: Dec = "2.5".parse().unwrap();
        assert_eq!(d.truncate_int(), U256::from(2u8));
        assert_eq!(d.ceil_int(), U256::from(3u8));
        assert_eq!(Dec::from_u64(4).ceil_int(), U256::from(4u8));
        assert_eq!(d.checked_quo_int(U256::from(2u8)).unwrap().to_string(), "1.250000000000000000");
        assert!(d.checked_quo_int(U256::ZERO).is_none());
        assert!(Dec::from_int(U256::MAX).is_none());
    }

    #[test]
    fn serde_as_string() {
        let d = Dec::from_u64(1_000_000_000);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, "\"1000000000.000000000000000000\"");
        let back: Dec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }
}
