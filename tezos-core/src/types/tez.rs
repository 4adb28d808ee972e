use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Error thrown when converting into [`Tez`]
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount is not a finite number")]
    NotFinite,
    #[error("amount overflows the mutez range")]
    Overflow,
    #[error("tez amounts have at most 6 decimals, got {0}")]
    TooManyDecimals(usize),
    #[error("invalid tez amount: {0}")]
    Invalid(String),
}

/// An amount of tez, stored losslessly as an integer number of mutez.
///
/// One tez is 1 000 000 mutez. Amounts are never negative.
///
/// ```
/// use tezos_core::types::Tez;
///
/// let amount: Tez = "1.5".parse().unwrap();
/// assert_eq!(amount.as_mutez(), 1_500_000);
/// assert_eq!(amount.to_string(), "1.500000");
/// assert_eq!(amount.rpc_representation(), "1500000");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tez(u64);

impl Tez {
    /// Number of mutez in one tez
    pub const MUTEZ_PER_TEZ: u64 = 1_000_000;

    pub const ZERO: Tez = Tez(0);

    pub const fn from_mutez(mutez: u64) -> Self {
        Self(mutez)
    }

    /// Whole tez, fails on overflow
    pub fn from_tez(tez: u64) -> Result<Self, ConversionError> {
        tez.checked_mul(Self::MUTEZ_PER_TEZ).map(Self).ok_or(ConversionError::Overflow)
    }

    pub const fn as_mutez(&self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Tez) -> Option<Tez> {
        self.0.checked_add(other.0).map(Tez)
    }

    pub fn checked_sub(self, other: Tez) -> Option<Tez> {
        self.0.checked_sub(other.0).map(Tez)
    }

    /// The decimal mutez string the node RPC expects
    pub fn rpc_representation(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Tez {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / Self::MUTEZ_PER_TEZ, self.0 % Self::MUTEZ_PER_TEZ)
    }
}

impl FromStr for Tez {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with('-') {
            return Err(ConversionError::Negative)
        }
        let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ConversionError::Invalid(s.to_owned()))
        }
        if fraction.len() > 6 {
            return Err(ConversionError::TooManyDecimals(fraction.len()))
        }
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(whole) || !is_digits(fraction) {
            return Err(ConversionError::Invalid(s.to_owned()))
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ConversionError::Overflow)?
        };
        let fraction: u64 = if fraction.is_empty() {
            0
        } else {
            format!("{fraction:0<6}").parse().map_err(|_| ConversionError::Invalid(s.to_owned()))?
        };

        whole
            .checked_mul(Self::MUTEZ_PER_TEZ)
            .and_then(|mutez| mutez.checked_add(fraction))
            .map(Tez)
            .ok_or(ConversionError::Overflow)
    }
}

impl TryFrom<f64> for Tez {
    type Error = ConversionError;

    /// Rounds to the nearest mutez.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return Err(ConversionError::NotFinite)
        }
        if value < 0.0 {
            return Err(ConversionError::Negative)
        }
        let mutez = (value * Self::MUTEZ_PER_TEZ as f64).round();
        if mutez >= u64::MAX as f64 {
            return Err(ConversionError::Overflow)
        }
        Ok(Tez(mutez as u64))
    }
}

impl From<Tez> for u64 {
    fn from(tez: Tez) -> Self {
        tez.0
    }
}

impl Serialize for Tez {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.rpc_representation())
    }
}

impl<'de> Deserialize<'de> for Tez {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mutez = String::deserialize(deserializer)?;
        mutez.parse::<u64>().map(Tez).map_err(de::Error::custom)
    }
}
