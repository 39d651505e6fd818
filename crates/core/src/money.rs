use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::category::LedgerError;

/// Whole yen. Receipts in this domain never carry fractional amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Yen(pub i64);

impl Yen {
    pub const fn new(amount: i64) -> Self {
        Yen(amount)
    }

    pub const fn zero() -> Self {
        Yen(0)
    }

    pub fn amount(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse user- or OCR-supplied numeric text.
    ///
    /// Accepts an optional `¥` prefix, `円` suffix and thousands separators.
    /// Fractional and exponent forms are rounded half away from zero, so
    /// anything `parseFloat`-like is accepted, negatives included.
    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        let clean: String = text
            .trim()
            .trim_start_matches(['¥', '￥'])
            .trim_end_matches('円')
            .chars()
            .filter(|c| *c != ',' && !c.is_whitespace())
            .collect();

        let dec = Decimal::from_str(&clean)
            .or_else(|_| Decimal::from_scientific(&clean))
            .map_err(|_| LedgerError::InvalidAmount(text.to_string()))?;

        dec.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .map(Yen)
            .ok_or_else(|| LedgerError::InvalidAmount(text.to_string()))
    }
}

impl FromStr for Yen {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Yen::parse(s)
    }
}

impl fmt::Display for Yen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            write!(f, "-{grouped}円")
        } else {
            write!(f, "{grouped}円")
        }
    }
}

// Saturating: any parseable number is a valid budget, so sums can reach the
// ends of the range.
impl Add for Yen {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Yen(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Yen {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Yen(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Yen {
    fn sum<I: Iterator<Item = Yen>>(iter: I) -> Self {
        iter.fold(Yen::zero(), |a, b| a + b)
    }
}

impl<'a> Sum<&'a Yen> for Yen {
    fn sum<I: Iterator<Item = &'a Yen>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
