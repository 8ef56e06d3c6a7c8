//! Amount type
//!
//! Domain primitive for monetary amounts in minor currency units.
//! Amounts arrive as decimal text and are validated before any store call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Amount represents a validated, non-negative quantity of minor units.
///
/// # Invariants
/// - Value is always `>= 0`
/// - Value fits a signed 64-bit integer (the store's balance column)
///
/// # Example
/// ```
/// use wallet_ledger::domain::Amount;
///
/// let amount: Amount = "250".parse().unwrap();
/// assert_eq!(amount.value(), 250);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must not be negative (got {0})")]
    Negative(i64),

    #[error("Amount must be positive")]
    Zero,

    #[error("Invalid amount format: {0}")]
    ParseError(String),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::Negative` if value < 0
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value < 0 {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Parse a top-up amount. Zero is accepted.
    pub fn parse_top_up(text: &str) -> Result<Self, AmountError> {
        text.parse()
    }

    /// Parse a transfer amount. Transfers must move something.
    pub fn parse_transfer(text: &str) -> Result<Self, AmountError> {
        let amount: Amount = text.parse()?;
        if amount.is_zero() {
            return Err(AmountError::Zero);
        }
        Ok(amount)
    }

    /// Get the underlying integer value.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|e| AmountError::ParseError(e.to_string()))?;
        Amount::new(value)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}
