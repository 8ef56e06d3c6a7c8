//! Ledger Store Errors
//!
//! Error types for ledger store operations.

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A conditional update touched the wrong number of rows
    #[error("Expected {expected} affected rows, got {affected}")]
    RowCount { expected: u64, affected: u64 },

    /// Account does not exist
    #[error("Account not found: {0}")]
    NotFound(String),

    /// Unique constraint violated (account number already taken)
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Debit rejected by the non-negative balance constraint
    #[error("Balance constraint rejected debit on {0}")]
    InsufficientFunds(String),

    /// Credit would push the balance past the column range
    #[error("Balance out of range on {0}")]
    BalanceOverflow(String),

    /// Row holds a value outside the domain model
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend refused the call (used by test doubles)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Check if this error is a row-count mismatch
    pub fn is_row_count(&self) -> bool {
        matches!(self, StoreError::RowCount { .. })
    }

    /// Check if this error is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation(_))
    }
}
