//! Wallet Creation Handler
//!
//! Issues the next account number and inserts an empty wallet for the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{AccountNumber, OperationContext, WalletError};
use crate::store::{LedgerStore, StoreError};

use super::CreateWalletResult;

/// Default number of attempts to claim a fresh account number
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Handler for wallet creation
pub struct CreateWalletHandler {
    store: Arc<dyn LedgerStore>,
    max_attempts: u32,
}

impl CreateWalletHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Create a wallet owned by the caller.
    ///
    /// Reading the latest number and inserting its successor is not atomic:
    /// two concurrent creations can compute the same number. The unique
    /// constraint rejects the loser, which re-reads and tries again.
    pub async fn execute(
        &self,
        context: &OperationContext,
    ) -> Result<CreateWalletResult, WalletError> {
        let owner_iin = context.subject_id();

        for attempt in 1..=self.max_attempts {
            let latest = self
                .store
                .latest_account_number()
                .await?
                .map(|raw| raw.parse::<AccountNumber>())
                .transpose()?;

            // Checked before any write
            let account_no = AccountNumber::successor_of(latest.as_ref())?;

            match self.store.create_account(account_no.as_str(), owner_iin).await {
                Ok(()) => {
                    tracing::info!(
                        account = %account_no,
                        owner = %owner_iin,
                        correlation_id = ?context.correlation_id,
                        "Created wallet"
                    );
                    return Ok(CreateWalletResult {
                        account_no: account_no.into(),
                        owner_iin: owner_iin.to_string(),
                    });
                }
                Err(StoreError::UniqueViolation(taken)) => {
                    tracing::warn!(
                        account = %taken,
                        "Account number taken concurrently, retrying (attempt {}/{})",
                        attempt,
                        self.max_attempts
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(Duration::from_millis(20 * attempt as u64)).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(WalletError::AccountNumberConflict {
            attempts: self.max_attempts,
        })
    }
}
