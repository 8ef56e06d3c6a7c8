//! Domain Error Types
//!
//! Business rule violations and ledger integrity failures raised by the
//! wallet use cases.

use thiserror::Error;

use super::account_number::AccountNumberError;
use super::amount::AmountError;
use super::wallet::TransferPhase;
use crate::store::StoreError;

/// Wallet use-case errors
///
/// Validation and ownership errors are raised before any state mutation.
/// Integrity errors (`LockConflict`, `InsufficientFunds`, `UpdateConflict`)
/// come from the store's row-level guarantees.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Requester does not own the account
    #[error("Owner identifier does not match the account owner")]
    OwnershipMismatch,

    /// Operation is reserved for admin tokens
    #[error("Admin privileges required")]
    AdminRequired,

    /// Amount text could not be parsed or is out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Account number space is exhausted
    #[error("Account number capacity exceeded after {0}")]
    CapacityExceeded(String),

    /// Store returned an account number that does not match the fixed format
    #[error("Stored account number is malformed: {0}")]
    CorruptAccountNumber(String),

    /// Every attempt to claim a fresh account number collided with a concurrent creation
    #[error("Account number conflict persisted after {attempts} attempts")]
    AccountNumberConflict { attempts: u32 },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transfer to same account
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    /// One of the accounts is missing or already part of an in-flight transfer
    #[error("Transfer lock conflict on {from} -> {to}")]
    LockConflict { from: String, to: String },

    #[error("Insufficient funds on account {account}")]
    InsufficientFunds { account: String },

    /// Balance row vanished between validation and update
    #[error("Update affected no rows for account {0}")]
    UpdateConflict(String),

    /// Phase 4 failed: the soft locks are still set and need an operator
    #[error("Failed to release transfer lock on {from} -> {to} (left {phase}): {source}")]
    LockReleaseFailed {
        from: String,
        to: String,
        phase: TransferPhase,
        #[source]
        source: StoreError,
    },

    /// Phase 3 failed and the compensating release failed as well
    #[error("{primary}; additionally: {release}")]
    ReleaseAfterFailure {
        primary: Box<WalletError>,
        release: Box<WalletError>,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl WalletError {
    /// The error that decides how the failure is classified.
    ///
    /// For a double failure this is the phase 3 error.
    pub fn primary(&self) -> &WalletError {
        match self {
            WalletError::ReleaseAfterFailure { primary, .. } => primary.primary(),
            other => other,
        }
    }

    /// Check if this is a client error (caller's fault)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.primary(),
            WalletError::InvalidAmount(_)
                | WalletError::InsufficientFunds { .. }
                | WalletError::SameAccountTransfer
                | WalletError::CapacityExceeded(_)
        )
    }

    /// Check if this is a conflict error (caller retry may help)
    pub fn is_conflict_error(&self) -> bool {
        matches!(
            self.primary(),
            WalletError::LockConflict { .. }
                | WalletError::UpdateConflict(_)
                | WalletError::AccountNumberConflict { .. }
        )
    }

    /// Whether the error leaves soft locks set and needs operator attention
    pub fn requires_alert(&self) -> bool {
        match self {
            WalletError::LockReleaseFailed { .. } => true,
            WalletError::ReleaseAfterFailure { .. } => true,
            _ => false,
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(account) => WalletError::AccountNotFound(account),
            StoreError::BalanceOverflow(account) => WalletError::InvalidAmount(format!(
                "amount would push the balance of {} out of range",
                account
            )),
            other => WalletError::Store(other),
        }
    }
}

impl From<AmountError> for WalletError {
    fn from(err: AmountError) -> Self {
        WalletError::InvalidAmount(err.to_string())
    }
}

impl From<AccountNumberError> for WalletError {
    fn from(err: AccountNumberError) -> Self {
        match err {
            AccountNumberError::CapacityExceeded(last) => WalletError::CapacityExceeded(last),
            AccountNumberError::Malformed(raw) => WalletError::CorruptAccountNumber(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_is_client_error() {
        let err = WalletError::InsufficientFunds {
            account: "KZT0000000001".to_string(),
        };

        assert!(err.is_client_error());
        assert!(!err.is_conflict_error());
        assert!(err.to_string().contains("KZT0000000001"));
    }

    #[test]
    fn test_lock_conflict_is_conflict_error() {
        let err = WalletError::LockConflict {
            from: "KZT0000000001".to_string(),
            to: "KZT0000000002".to_string(),
        };

        assert!(err.is_conflict_error());
        assert!(!err.is_client_error());
        assert!(!err.requires_alert());
    }

    #[test]
    fn test_double_failure_classified_by_primary() {
        let err = WalletError::ReleaseAfterFailure {
            primary: Box::new(WalletError::InsufficientFunds {
                account: "KZT0000000001".to_string(),
            }),
            release: Box::new(WalletError::LockReleaseFailed {
                from: "KZT0000000001".to_string(),
                to: "KZT0000000002".to_string(),
                phase: TransferPhase::Locked,
                source: StoreError::RowCount {
                    expected: 2,
                    affected: 1,
                },
            }),
        };

        assert!(err.is_client_error());
        assert!(err.requires_alert());
        assert!(matches!(err.primary(), WalletError::InsufficientFunds { .. }));
        assert!(err.to_string().contains("release"));
    }

    #[test]
    fn test_store_not_found_becomes_account_not_found() {
        let err: WalletError = StoreError::NotFound("KZT0000000009".to_string()).into();
        assert!(matches!(err, WalletError::AccountNotFound(ref a) if a == "KZT0000000009"));

        let err: WalletError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(err, WalletError::Store(_)));
    }

    #[test]
    fn test_balance_overflow_becomes_invalid_amount() {
        let err: WalletError = StoreError::BalanceOverflow("KZT0000000001".to_string()).into();
        assert!(matches!(err, WalletError::InvalidAmount(ref m) if m.contains("KZT0000000001")));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_amount_error_conversion() {
        let err: WalletError = AmountError::Negative(-3).into();
        assert!(matches!(err, WalletError::InvalidAmount(_)));
    }

    #[test]
    fn test_account_number_error_conversion() {
        let err: WalletError = AccountNumberError::CapacityExceeded("KZT9999999999".into()).into();
        assert!(matches!(err, WalletError::CapacityExceeded(_)));

        let err: WalletError = AccountNumberError::Malformed("bogus".into()).into();
        assert!(matches!(err, WalletError::CorruptAccountNumber(_)));
    }
}
