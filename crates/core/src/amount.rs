use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A numeric value read off a bill.
///
/// Whole values are kept as integers so they go over the wire as `500`
/// rather than `500.0`; everything else is an exact decimal serialized as a
/// JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Whole(i64),
    Fractional(#[serde(with = "rust_decimal::serde::float")] Decimal),
}

impl Amount {
    pub fn from_decimal(value: Decimal) -> Self {
        if value.fract().is_zero() {
            if let Some(whole) = value.to_i64() {
                return Amount::Whole(whole);
            }
        }
        Amount::Fractional(value.normalize())
    }

    /// Parse a cleaned numeric string such as `"1200"` or `"49.99"`.
    pub fn parse(s: &str) -> Option<Self> {
        Decimal::from_str(s.trim()).ok().map(Self::from_decimal)
    }

    /// Collapse `Fractional(500.0)` (as produced by a JSON float) into `Whole(500)`.
    pub fn normalized(self) -> Self {
        match self {
            Amount::Whole(_) => self,
            Amount::Fractional(d) => Self::from_decimal(d),
        }
    }

    pub fn to_decimal(self) -> Decimal {
        match self {
            Amount::Whole(n) => Decimal::from(n),
            Amount::Fractional(d) => d,
        }
    }

    pub fn is_positive(self) -> bool {
        self.to_decimal() > Decimal::ZERO
    }

    /// The value truncated toward zero, as decimal digits. This is the form
    /// searched for in the source text when locating an amount.
    pub fn integer_text(self) -> String {
        match self {
            Amount::Whole(n) => n.to_string(),
            Amount::Fractional(d) => {
                let whole = d.trunc();
                whole
                    .to_i64()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| whole.normalize().to_string())
            }
        }
    }
}

impl From<i64> for Amount {
    fn from(n: i64) -> Self {
        Amount::Whole(n)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Whole(n) => write!(f, "{n}"),
            Amount::Fractional(d) => write!(f, "{}", d.normalize()),
        }
    }
}
