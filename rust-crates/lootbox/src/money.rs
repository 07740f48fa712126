//! Fixed-point currency.
//!
//! Every balance, price and item value in the store is a whole number of
//! cents. Text like `"4.99"` parses exactly, so repeated purchases and sales
//! never accumulate rounding error.

use crate::{
    Error,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    iter::Sum,
    str::FromStr,
};

const CENTS_PER_DOLLAR: u64 = 100;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Money(cents)
    }

    pub fn from_dollars(dollars: u64) -> Result<Self> {
        dollars
            .checked_mul(CENTS_PER_DOLLAR)
            .map(Money)
            .ok_or_else(|| Error::InvalidAmount(format!("{dollars} dollars overflows")))
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Result<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| Error::InvalidAmount(format!("{self} + {other} overflows")))
    }

    /// `None` when `other` is larger than `self`.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn checked_mul(self, factor: u64) -> Result<Money> {
        self.0
            .checked_mul(factor)
            .map(Money)
            .ok_or_else(|| Error::InvalidAmount(format!("{self} x {factor} overflows")))
    }

    /// Plain decimal form without the currency sign, e.g. `12.50`.
    pub fn to_decimal_string(self) -> String {
        format!(
            "{}.{:02}",
            self.0 / CENTS_PER_DOLLAR,
            self.0 % CENTS_PER_DOLLAR
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.to_decimal_string())
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidAmount(format!("{s:?} is not a dollar amount"));
        let text = s.trim();
        let text = text.strip_prefix('$').unwrap_or(text);
        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 2
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let dollars = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| invalid())?
        };
        let cents = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse::<u64>().map_err(|_| invalid())?,
        };
        Money::from_dollars(dollars)?.checked_add(Money(cents))
    }
}

impl TryFrom<String> for Money {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_decimal_string()
    }
}

/// Saturates at `u64::MAX` cents.
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        Money(iter.fold(0u64, |acc, m| acc.saturating_add(m.0)))
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn from_str__parses_exact_cents() {
        assert_eq!("4.99".parse::<Money>().unwrap(), Money::from_cents(499));
        assert_eq!("$12".parse::<Money>().unwrap(), Money::from_cents(1200));
        assert_eq!("0.5".parse::<Money>().unwrap(), Money::from_cents(50));
        assert_eq!(".25".parse::<Money>().unwrap(), Money::from_cents(25));
        assert_eq!(" 8.50 ".parse::<Money>().unwrap(), Money::from_cents(850));
    }

    #[test]
    fn from_str__rejects_malformed_text() {
        for bad in ["", ".", "-1.00", "1.999", "abc", "1,50", "1.2.3", "$"] {
            assert!(bad.parse::<Money>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn display__renders_dollars_and_cents() {
        assert_eq!(Money::from_cents(2050).to_string(), "$20.50");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn checked_sub__refuses_to_go_negative() {
        let five = Money::from_cents(500);
        let ten = Money::from_cents(1000);
        assert_eq!(five.checked_sub(ten), None);
        assert_eq!(ten.checked_sub(five), Some(five));
    }

    #[test]
    fn serde__uses_decimal_strings() {
        // given
        let price = Money::from_cents(3499);

        // when
        let json = serde_json::to_string(&price).unwrap();
        let back: Money = serde_json::from_str(&json).unwrap();

        // then
        assert_eq!(json, "\"34.99\"");
        assert_eq!(back, price);
    }

    #[test]
    fn sum__adds_without_drift() {
        let values = vec![Money::from_cents(10); 1_000];
        let total: Money = values.iter().sum();
        assert_eq!(total, Money::from_cents(10_000));
    }
}
