use std::{
    fmt::Display,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const VND_CURRENCY_CODE: &str = "VND";
/// Gateways quote amounts in hundredths of a dong.
pub const GATEWAY_AMOUNT_SCALE: i64 = 100;

//--------------------------------------        Vnd         ---------------------------------------------------------
/// An amount of Vietnamese dong. The dong has no minor unit in circulation, so amounts are whole numbers.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Vnd(i64);

op!(binary Vnd, Add, add);
op!(binary Vnd, Sub, sub);
op!(inplace Vnd, AddAssign, add_assign);
op!(inplace Vnd, SubAssign, sub_assign);
op!(unary Vnd, Neg, neg);

impl Mul<i64> for Vnd {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Value cannot be represented in VND: {0}")]
pub struct VndConversionError(String);

impl From<i64> for Vnd {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for Vnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{sign}{grouped} ₫")
    }
}

impl Vnd {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// `self + rhs`, or `None` on overflow.
    pub fn checked_add(self, rhs: Vnd) -> Option<Vnd> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// `self * rhs`, or `None` on overflow. Use this for anything a caller controls, like line quantities.
    pub fn checked_mul(self, rhs: i64) -> Option<Vnd> {
        self.0.checked_mul(rhs).map(Self)
    }

    /// The amount as the gateway expects it in `vnp_Amount`, or `None` if it does not fit.
    pub fn gateway_amount(&self) -> Option<i64> {
        self.0.checked_mul(GATEWAY_AMOUNT_SCALE)
    }

    /// Parses a gateway-scaled amount string. Anything other than a non-negative integer that is a whole number of
    /// dong is rejected.
    pub fn from_gateway_amount(raw: &str) -> Result<Self, VndConversionError> {
        let raw = raw.trim();
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VndConversionError(format!("'{raw}' is not a non-negative integer")));
        }
        let scaled = raw.parse::<i64>().map_err(|e| VndConversionError(format!("'{raw}': {e}")))?;
        if scaled % GATEWAY_AMOUNT_SCALE != 0 {
            return Err(VndConversionError(format!("{scaled} is not a whole number of dong")));
        }
        Ok(Self(scaled / GATEWAY_AMOUNT_SCALE))
    }
}
