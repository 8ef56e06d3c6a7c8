//! Lock Reconciliation Handler
//!
//! Operator access to soft locks left set by a transfer that never reached
//! its release phase. Nothing here runs automatically.

use std::sync::Arc;

use crate::domain::{OperationContext, Wallet, WalletError};
use crate::store::{LedgerStore, StoreError};

/// Handler for inspecting and releasing stuck transfer locks
pub struct LockReconciliationHandler {
    store: Arc<dyn LedgerStore>,
}

impl LockReconciliationHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Wallets currently holding a transfer lock
    pub async fn locked_accounts(
        &self,
        context: &OperationContext,
    ) -> Result<Vec<Wallet>, WalletError> {
        require_admin(context)?;
        Ok(self.store.locked_accounts().await?)
    }

    /// Clear the lock on one wallet
    pub async fn release(
        &self,
        context: &OperationContext,
        account_no: &str,
    ) -> Result<(), WalletError> {
        require_admin(context)?;

        self.store
            .release_lock(account_no)
            .await
            .map_err(|e| match e {
                StoreError::RowCount { .. } => WalletError::UpdateConflict(account_no.to_string()),
                other => other.into(),
            })?;

        tracing::warn!(
            account = %account_no,
            operator = %context.subject_id(),
            correlation_id = ?context.correlation_id,
            "Transfer lock released by operator"
        );
        Ok(())
    }
}

fn require_admin(context: &OperationContext) -> Result<(), WalletError> {
    if context.is_admin() {
        Ok(())
    } else {
        Err(WalletError::AdminRequired)
    }
}
