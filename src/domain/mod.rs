//! Domain module
//!
//! Core domain types and business rules.

pub mod account_number;
pub mod amount;
pub mod context;
pub mod error;
pub mod wallet;

pub use account_number::{AccountNumber, AccountNumberError, ACCOUNT_DIGITS, ACCOUNT_PREFIX};
pub use amount::{Amount, AmountError};
pub use context::{Identity, OperationContext};
pub use error::WalletError;
pub use wallet::{TransactionKind, TransactionRecord, TransferLock, TransferPhase, Wallet};
