//! Top-Up Handler
//!
//! Adds funds to a wallet owned by the caller.

use std::sync::Arc;

use crate::domain::{Amount, OperationContext, WalletError};
use crate::store::{LedgerStore, StoreError};

use super::{ensure_owner, TopUpCommand, TopUpResult};

/// Handler for wallet top-ups
pub struct TopUpHandler {
    store: Arc<dyn LedgerStore>,
}

impl TopUpHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute the top-up command
    pub async fn execute(
        &self,
        command: TopUpCommand,
        context: &OperationContext,
    ) -> Result<TopUpResult, WalletError> {
        ensure_owner(self.store.as_ref(), context.subject_id(), &command.account_no).await?;

        let amount = Amount::parse_top_up(&command.amount)?;

        self.store
            .apply_top_up(&command.account_no, amount.value())
            .await
            .map_err(|e| match e {
                StoreError::RowCount { .. } => WalletError::UpdateConflict(command.account_no.clone()),
                other => other.into(),
            })?;

        let balance = self.store.balance(&command.account_no).await?;

        tracing::info!(
            account = %command.account_no,
            amount = %amount,
            balance,
            correlation_id = ?context.correlation_id,
            "Top-up applied"
        );

        Ok(TopUpResult {
            account_no: command.account_no,
            balance,
        })
    }
}
