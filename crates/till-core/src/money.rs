//! # Money Module
//!
//! Provides the `Money` type for monetary values held by the ledgers.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Order payloads carry amounts as JSON numbers:                         │
//! │    "ticket_amount": 42.5                                               │
//! │                                                                         │
//! │  Reading that through f64 and multiplying by 100 can land on           │
//! │  4249.999... and truncate to the wrong cent.                            │
//! │                                                                         │
//! │  OUR SOLUTION: parse the decimal text directly into integer cents       │
//! │    "42.5" → 4250                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::money::Money;
//!
//! let amount = Money::parse_decimal("42.50").unwrap();
//! assert_eq!(amount.cents(), 4250);
//! assert_eq!(amount.to_string(), "42.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::ValidationResult;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: refunds and voids may be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal amount such as `"42.5"` or `"-3.99"` into cents.
    ///
    /// Digits past the cent are rounded half away from zero. Exponent
    /// notation, thousands separators and currency symbols are rejected.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("19.99").unwrap().cents(), 1999);
    /// assert_eq!(Money::parse_decimal("0.30000000000000004").unwrap().cents(), 30);
    /// assert!(Money::parse_decimal("1e3").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> ValidationResult<Money> {
        let text = input.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction)
        {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("'{input}' is not a decimal number"),
            ));
        }

        let overflow = || ValidationError::invalid_format("amount", format!("'{input}' is too large"));

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };

        let mut digits = fraction.bytes().map(|b| i64::from(b - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().is_some_and(|d| d >= 5);

        let cents = whole_value
            .checked_mul(100)
            .and_then(|c| c.checked_add(tenths * 10 + hundredths + i64::from(round_up)))
            .ok_or_else(overflow)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering with two minor digits, no currency symbol.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_parse_decimal_plain_values() {
        assert_eq!(Money::parse_decimal("42.50").unwrap().cents(), 4250);
        assert_eq!(Money::parse_decimal("42.5").unwrap().cents(), 4250);
        assert_eq!(Money::parse_decimal("42").unwrap().cents(), 4200);
        assert_eq!(Money::parse_decimal("42.").unwrap().cents(), 4200);
        assert_eq!(Money::parse_decimal(".5").unwrap().cents(), 50);
        assert_eq!(Money::parse_decimal("0").unwrap().cents(), 0);
    }

    #[test]
    fn test_parse_decimal_signs() {
        assert_eq!(Money::parse_decimal("-3.99").unwrap().cents(), -399);
        assert_eq!(Money::parse_decimal("+3.99").unwrap().cents(), 399);
    }

    #[test]
    fn test_parse_decimal_rounds_extra_digits() {
        assert_eq!(Money::parse_decimal("0.125").unwrap().cents(), 13);
        assert_eq!(Money::parse_decimal("0.124").unwrap().cents(), 12);
        assert_eq!(Money::parse_decimal("-0.125").unwrap().cents(), -13);
        assert_eq!(Money::parse_decimal("0.30000000000000004").unwrap().cents(), 30);
        assert_eq!(Money::parse_decimal("4249.999").unwrap().cents(), 425000);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        for bad in ["", ".", "-", "abc", "1e3", "1,000.00", "$5", "1.2.3", "--1"] {
            assert!(Money::parse_decimal(bad).is_err(), "accepted {bad:?}");
        }
        assert!(Money::parse_decimal("99999999999999999999").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(4250).to_string(), "42.50");
        assert_eq!(Money::from_cents(-5).to_string(), "-0.05");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_add() {
        let mut total = Money::from_cents(100) + Money::from_cents(50);
        total += Money::from_cents(1);
        assert_eq!(total.cents(), 151);
    }
}
