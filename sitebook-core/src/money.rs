//! Decimal amounts carried as strings.
//!
//! The backend sends monetary fields as decimal strings. They stay strings on
//! the client; the only arithmetic performed is the shift into minor units
//! for the checkout gateway, which is done on digits rather than floats.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MoneyError;

/// A decimal amount as sent by the backend, e.g. `"1250.50"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Money(String);

impl Money {
    /// Wrap a decimal string, rejecting anything that is not a plain decimal.
    pub fn parse(value: impl Into<String>) -> Result<Self, MoneyError> {
        let value = value.into();
        let trimmed = value.trim();
        split_decimal(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn zero() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Amount in minor units (paise, cents): `"499.5"` becomes `49950`.
    ///
    /// Digits past the second fractional place are rounded half-up.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        let (negative, whole, fraction) = split_decimal(&self.0)?;
        let overflow = || MoneyError::Overflow {
            value: self.0.clone(),
        };

        let mut units: i64 = 0;
        for digit in whole.bytes() {
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(i64::from(digit - b'0')))
                .ok_or_else(overflow)?;
        }

        let mut frac = fraction.bytes().chain(std::iter::repeat(b'0'));
        for _ in 0..2 {
            let digit = frac.next().unwrap_or(b'0');
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(i64::from(digit - b'0')))
                .ok_or_else(overflow)?;
        }
        if fraction.len() > 2 && fraction.as_bytes()[2] >= b'5' {
            units = units.checked_add(1).ok_or_else(overflow)?;
        }

        Ok(if negative { -units } else { units })
    }
}

/// Split into sign, whole digits, fraction digits.
fn split_decimal(value: &str) -> Result<(bool, &str, &str), MoneyError> {
    let not_decimal = || MoneyError::NotDecimal {
        value: value.to_string(),
    };
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (whole, fraction) = match body.split_once('.') {
        Some((w, f)) => (w, f),
        None => (body, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(not_decimal());
    }
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(whole) || !digits_only(fraction) {
        return Err(not_decimal());
    }
    Ok((negative, whole, fraction))
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MoneyVisitor;

        impl Visitor<'_> for MoneyVisitor {
            type Value = Money;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or integer amount")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
                Money::parse(v).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
                Ok(Money(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
                Ok(Money(v.to_string()))
            }

            // Floats only arrive from backends that already lost precision.
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
                Money::parse(v.to_string()).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(MoneyVisitor)
    }
}
