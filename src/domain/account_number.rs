//! Account numbers
//!
//! Fixed-format wallet identifiers: an alphanumeric prefix followed by a
//! zero-padded decimal counter, e.g. `KZT0000000042`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix shared by every account number
pub const ACCOUNT_PREFIX: &str = "KZT";

/// Width of the numeric suffix
pub const ACCOUNT_DIGITS: usize = 10;

/// Largest suffix that fits `ACCOUNT_DIGITS`
const MAX_SEQUENCE: u64 = 9_999_999_999;

/// Errors produced while parsing or advancing account numbers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountNumberError {
    #[error("Malformed account number: {0}")]
    Malformed(String),

    #[error("Account number space exhausted after {0}")]
    CapacityExceeded(String),
}

/// A validated account number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    /// The number that precedes the first ever issued account.
    pub fn seed() -> Self {
        Self::from_sequence(0)
    }

    fn from_sequence(sequence: u64) -> Self {
        Self(format!(
            "{}{:0width$}",
            ACCOUNT_PREFIX,
            sequence,
            width = ACCOUNT_DIGITS
        ))
    }

    /// Numeric suffix of this account number
    pub fn sequence(&self) -> u64 {
        // Validated on construction
        self.0[ACCOUNT_PREFIX.len()..].parse().unwrap_or_default()
    }

    /// The account number issued after this one.
    ///
    /// Fails before anything is written if the incremented suffix would not
    /// fit the fixed digit width.
    pub fn next(&self) -> Result<Self, AccountNumberError> {
        let sequence = self.sequence();
        if sequence >= MAX_SEQUENCE {
            return Err(AccountNumberError::CapacityExceeded(self.0.clone()));
        }
        Ok(Self::from_sequence(sequence + 1))
    }

    /// Issue the successor of `latest`, or the first number when the store
    /// holds no accounts yet.
    pub fn successor_of(latest: Option<&AccountNumber>) -> Result<Self, AccountNumberError> {
        match latest {
            Some(latest) => latest.next(),
            None => Self::seed().next(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountNumber {
    type Err = AccountNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(ACCOUNT_PREFIX)
            .ok_or_else(|| AccountNumberError::Malformed(s.to_string()))?;

        if digits.len() != ACCOUNT_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AccountNumberError::Malformed(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = AccountNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(account: AccountNumber) -> Self {
        account.0
    }
}
