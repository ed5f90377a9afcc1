use std::{fmt, str::FromStr};

use num_bigint::{BigInt, BigUint};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Token amount in the token's smallest unit, arbitrary precision.
///
/// Serialized as a decimal string so values above 2^53 survive the JSON
/// round trip through the front-end.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawAmount(pub BigUint);

/// Running on-chain total (volume, liquidity or fees) since pool inception.
pub type CumulativeCounter = RawAmount;

impl RawAmount {
    pub fn zero() -> Self {
        Self(BigUint::default())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::default()
    }

    /// Signed difference `self - other`.
    pub fn signed_sub(&self, other: &RawAmount) -> BigInt {
        BigInt::from(self.0.clone()) - BigInt::from(other.0.clone())
    }

    /// Saturating difference, 0 when `other > self`.
    pub fn saturating_sub(&self, other: &RawAmount) -> RawAmount {
        if self.0 >= other.0 {
            RawAmount(&self.0 - &other.0)
        } else {
            RawAmount::zero()
        }
    }
}

impl From<u64> for RawAmount {
    fn from(v: u64) -> Self {
        Self(BigUint::from(v))
    }
}

impl From<u128> for RawAmount {
    fn from(v: u128) -> Self {
        Self(BigUint::from(v))
    }
}

impl FromStr for RawAmount {
    type Err = num_bigint::ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigUint::from_str(s.trim()).map(Self)
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for RawAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Older documents hold small counters as plain JSON numbers
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => RawAmount::from_str(&s).map_err(de::Error::custom),
            Repr::Num(n) => Ok(RawAmount::from(n)),
        }
    }
}

/// Prior observation of a cumulative counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Pool seen for the first time, no baseline
    Cold,
    /// Counter value recorded by the previous run
    Warm(CumulativeCounter),
}

impl Observation {
    pub fn from_previous(prev: Option<&CumulativeCounter>) -> Self {
        match prev {
            Some(counter) => Observation::Warm(counter.clone()),
            None => Observation::Cold,
        }
    }

    /// Baseline for level metrics (liquidity) valued as a whole.
    pub fn zero_baseline() -> Self {
        Observation::Warm(RawAmount::zero())
    }
}
