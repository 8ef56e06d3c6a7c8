//! Ledger Store module
//!
//! The storage capability consumed by the wallet use cases. Every method is
//! either a single read or one atomic store transaction; no state is shared
//! between calls except what the rows themselves hold.

mod error;
mod memory;
mod postgres;

use async_trait::async_trait;

use crate::domain::{TransactionRecord, Wallet};

pub use error::StoreError;
pub use memory::{FaultPoint, InMemoryLedgerStore};
pub use postgres::PgLedgerStore;

/// Transactional wallet/transaction storage keyed by account number.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Most recently created account number, `None` when no wallet exists.
    async fn latest_account_number(&self) -> Result<Option<String>, StoreError>;

    /// Insert a wallet with zero balance and an idle lock.
    ///
    /// Fails with `UniqueViolation` if the account number is taken.
    async fn create_account(&self, account_no: &str, owner_iin: &str) -> Result<(), StoreError>;

    async fn accounts_by_owner(&self, owner_iin: &str) -> Result<Vec<Wallet>, StoreError>;

    async fn account_numbers_by_owner(&self, owner_iin: &str) -> Result<Vec<String>, StoreError>;

    /// Current balance. Fails with `NotFound` for unknown accounts.
    async fn balance(&self, account_no: &str) -> Result<i64, StoreError>;

    /// Whether `owner_iin` owns the account. Fails with `NotFound` for unknown accounts.
    async fn owner_matches(&self, owner_iin: &str, account_no: &str) -> Result<bool, StoreError>;

    /// Atomically add `amount` to the balance and append a `topup` record.
    ///
    /// Fails with `RowCount` if the balance update touched no row.
    async fn apply_top_up(&self, account_no: &str, amount: i64) -> Result<(), StoreError>;

    /// Set or clear the soft lock on both accounts in one transaction.
    ///
    /// Setting requires both rows idle, clearing requires both rows locked.
    /// Anything other than exactly two affected rows rolls back with `RowCount`.
    async fn set_lock(&self, account_a: &str, account_b: &str, locked: bool)
        -> Result<(), StoreError>;

    /// Atomically debit `from`, credit `to` and append a `transfer` record.
    ///
    /// Fails with `InsufficientFunds` if the debit would make `from` negative.
    async fn apply_transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), StoreError>;

    /// Transaction records where the account is source or destination, oldest first.
    async fn list_transactions(&self, account_no: &str)
        -> Result<Vec<TransactionRecord>, StoreError>;

    /// Wallets whose soft lock is currently set.
    async fn locked_accounts(&self) -> Result<Vec<Wallet>, StoreError>;

    /// Clear the soft lock on one account. Fails with `RowCount` if it was not locked.
    async fn release_lock(&self, account_no: &str) -> Result<(), StoreError>;
}
