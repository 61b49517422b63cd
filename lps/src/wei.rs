//! The monetary value type used for every amount handled by the liquidity
//! provider.
//!
//! [`Wei`] is an immutable, non-negative integer. All arithmetic is checked
//! and returns a new value, so an overflow or an underflow surfaces as an
//! [`Error::WeiOverflow`] instead of silently wrapping.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::U256;
use serde::de::Visitor;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::Error;

/// The number of wei in a single satoshi. One RBTC and one BTC both have
/// 10^18 wei and 10^8 satoshis respectively.
pub const WEI_PER_SATOSHI: u64 = 10_000_000_000;

/// An amount of the destination chain's smallest currency unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(U256);

impl Wei {
    /// Zero wei.
    pub const ZERO: Wei = Wei(U256::ZERO);

    /// Create a new amount from the given number of wei.
    pub fn new(value: u64) -> Self {
        Self(U256::from(value))
    }

    /// Convert an amount of satoshis into wei.
    pub fn from_satoshis(satoshis: u64) -> Self {
        Self(U256::from(satoshis) * U256::from(WEI_PER_SATOSHI))
    }

    /// Convert the amount into satoshis, rounding down.
    pub fn to_satoshis(&self) -> Result<u64, Error> {
        Wei(self.0 / U256::from(WEI_PER_SATOSHI)).to_u64()
    }

    /// Whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Return the amount as a `u64`, failing if it does not fit.
    pub fn to_u64(&self) -> Result<u64, Error> {
        u64::try_from(self.0).map_err(|_| Error::WeiOverflow("u64 conversion"))
    }

    pub fn checked_add(self, rhs: Wei) -> Result<Wei, Error> {
        self.0
            .checked_add(rhs.0)
            .map(Wei)
            .ok_or(Error::WeiOverflow("addition"))
    }

    pub fn checked_sub(self, rhs: Wei) -> Result<Wei, Error> {
        self.0
            .checked_sub(rhs.0)
            .map(Wei)
            .ok_or(Error::WeiOverflow("subtraction"))
    }

    pub fn checked_mul(self, rhs: Wei) -> Result<Wei, Error> {
        self.0
            .checked_mul(rhs.0)
            .map(Wei)
            .ok_or(Error::WeiOverflow("multiplication"))
    }

    /// Integer division, rounding toward zero. Dividing by zero is an
    /// error.
    pub fn checked_div(self, rhs: Wei) -> Result<Wei, Error> {
        self.0
            .checked_div(rhs.0)
            .map(Wei)
            .ok_or(Error::WeiOverflow("division"))
    }

    /// `max(0, self - rhs)`.
    pub fn saturating_sub(self, rhs: Wei) -> Wei {
        Wei(self.0.saturating_sub(rhs.0))
    }

    /// Computes `self * numerator / denominator` without losing precision in
    /// the intermediate product.
    pub fn mul_div(self, numerator: Wei, denominator: Wei) -> Result<Wei, Error> {
        self.checked_mul(numerator)?.checked_div(denominator)
    }

    /// Sum the given amounts.
    pub fn sum<'a, I>(values: I) -> Result<Wei, Error>
    where
        I: IntoIterator<Item = &'a Wei>,
    {
        values
            .into_iter()
            .try_fold(Wei::ZERO, |acc, value| acc.checked_add(*value))
    }
}

impl From<u64> for Wei {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<u32> for Wei {
    fn from(value: u32) -> Self {
        Self::new(value as u64)
    }
}

impl From<U256> for Wei {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Wei {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str_radix(s.trim(), 10)
            .map(Wei)
            .map_err(|_| Error::InvalidWei(s.to_string()))
    }
}

impl Serialize for Wei {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct WeiVisitor;

impl<'de> Visitor<'de> for WeiVisitor {
    type Value = Wei;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Ok(Wei::new(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        u64::try_from(v)
            .map(Wei::new)
            .map_err(|_| E::custom(format!("negative amount: {v}")))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(WeiVisitor)
    }
}

#[cfg(any(test, feature = "testing"))]
impl fake::Dummy<fake::Faker> for Wei {
    fn dummy_with_rng<R: rand::Rng + ?Sized>(_: &fake::Faker, rng: &mut R) -> Self {
        Wei::new(rng.gen_range(1..1_000_000_000_000_000_000))
    }
}
