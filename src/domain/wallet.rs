//! Wallet and transaction records
//!
//! Row-level data model owned by the ledger store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Soft-lock flag on a wallet row.
///
/// `Locked` is transient: it is set in phase 2 of a transfer and cleared in
/// phase 4. A process or store crash between those phases leaves the row
/// `Locked` until an operator releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferLock {
    Idle,
    Locked,
}

impl TransferLock {
    /// Column value
    pub fn as_flag(self) -> i16 {
        match self {
            TransferLock::Idle => 0,
            TransferLock::Locked => 1,
        }
    }

    pub fn from_flag(flag: i16) -> Option<Self> {
        match flag {
            0 => Some(TransferLock::Idle),
            1 => Some(TransferLock::Locked),
            _ => None,
        }
    }

    pub fn is_locked(self) -> bool {
        self == TransferLock::Locked
    }
}

/// How far a single transfer attempt got through the protocol.
///
/// Used to report where a wallet pair was left when lock release fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    /// Nothing committed
    Idle,
    /// Both soft locks held, balances untouched
    Locked,
    /// Both soft locks held, balances moved and recorded
    LockedMutated,
    /// Soft locks released
    Released,
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferPhase::Idle => "idle",
            TransferPhase::Locked => "locked",
            TransferPhase::LockedMutated => "locked+mutated",
            TransferPhase::Released => "released",
        };
        f.write_str(name)
    }
}

/// A wallet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub account_no: String,
    pub owner_iin: String,
    pub balance: i64,
    pub transfer_lock: TransferLock,
    /// When the current transfer lock was taken, `None` while idle
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of balance mutation recorded in the transaction log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    TopUp,
    Transfer,
}

impl TransactionKind {
    /// Column value
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::TopUp => "topup",
            TransactionKind::Transfer => "transfer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "topup" => Some(TransactionKind::TopUp),
            "transfer" => Some(TransactionKind::Transfer),
            _ => None,
        }
    }
}

/// An append-only transaction log entry.
///
/// `from_account` is empty for top-ups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub kind: TransactionKind,
    pub from_account: String,
    pub to_account: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_flag_round_trip() {
        assert_eq!(TransferLock::from_flag(0), Some(TransferLock::Idle));
        assert_eq!(TransferLock::from_flag(1), Some(TransferLock::Locked));
        assert_eq!(TransferLock::from_flag(2), None);
        assert_eq!(TransferLock::Locked.as_flag(), 1);
    }

    #[test]
    fn test_transaction_kind_column_values() {
        assert_eq!(TransactionKind::TopUp.as_str(), "topup");
        assert_eq!(TransactionKind::parse("transfer"), Some(TransactionKind::Transfer));
        assert_eq!(TransactionKind::parse("refund"), None);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(TransferPhase::LockedMutated.to_string(), "locked+mutated");
    }
}
