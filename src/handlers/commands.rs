//! Command definitions
//!
//! Commands represent intentions to change the ledger state.

use serde::{Deserialize, Serialize};

use crate::domain::TransferPhase;

// =========================================================================
// TopUpCommand
// =========================================================================

/// Command to add funds to one of the caller's wallets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpCommand {
    pub account_no: String,
    /// Amount as decimal text, parsed by the handler
    pub amount: String,
}

impl TopUpCommand {
    pub fn new(account_no: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            account_no: account_no.into(),
            amount: amount.into(),
        }
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move funds between two wallets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Source account, must be owned by the caller
    pub from: String,
    pub to: String,
    /// Amount as decimal text, parsed by the handler
    pub amount: String,
}

impl TransferCommand {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
        }
    }
}

/// Result of a successful wallet creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWalletResult {
    pub account_no: String,
    pub owner_iin: String,
}

/// Result of a successful top-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpResult {
    pub account_no: String,
    /// Balance read back after the update committed
    pub balance: i64,
}

/// Result of a successful transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub phase: TransferPhase,
}
