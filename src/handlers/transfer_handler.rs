//! Transfer Handler
//!
//! Moves funds between two wallets with a four-phase protocol:
//!
//! 1. confirm the caller owns the source wallet
//! 2. set the soft lock on both wallets, conditioned on both being idle
//! 3. debit, credit and record the transfer in one store transaction
//! 4. clear both soft locks, whatever phase 3 returned
//!
//! The soft lock is advisory. It keeps two transfers sharing a wallet out of
//! phase 3 at the same time but does not isolate top-ups or reads. A crash
//! between phases 2 and 4 leaves the wallets locked; the lock reconciliation
//! handler is the way out.

use std::sync::Arc;

use crate::domain::{Amount, OperationContext, TransferPhase, WalletError};
use crate::store::{LedgerStore, StoreError};

use super::{ensure_owner, TransferCommand, TransferResult};

// =========================================================================
// TransferHandler
// =========================================================================

/// Handler for wallet-to-wallet transfers
pub struct TransferHandler {
    store: Arc<dyn LedgerStore>,
}

impl TransferHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Execute the transfer command
    pub async fn execute(
        &self,
        command: TransferCommand,
        context: &OperationContext,
    ) -> Result<TransferResult, WalletError> {
        let TransferCommand { from, to, amount } = command;

        // Phase 1: ownership
        ensure_owner(self.store.as_ref(), context.subject_id(), &from).await?;

        let amount = Amount::parse_transfer(&amount)?;
        if from == to {
            return Err(WalletError::SameAccountTransfer);
        }

        // Phase 2: nothing is committed if this fails
        self.acquire(&from, &to).await?;

        // Phase 3
        let moved = self
            .store
            .apply_transfer(&from, &to, amount.value())
            .await
            .map_err(|e| classify_movement(e, &from));
        let phase = if moved.is_ok() {
            TransferPhase::LockedMutated
        } else {
            TransferPhase::Locked
        };

        // Phase 4: runs on both outcomes of phase 3
        let released = self.release(&from, &to, phase).await;

        match (moved, released) {
            (Ok(()), Ok(())) => {
                tracing::info!(
                    from = %from,
                    to = %to,
                    amount = %amount,
                    correlation_id = ?context.correlation_id,
                    "Transfer completed"
                );
                Ok(TransferResult {
                    from,
                    to,
                    amount: amount.value(),
                    phase: TransferPhase::Released,
                })
            }
            (Ok(()), Err(release)) => Err(release),
            (Err(primary), Ok(())) => {
                tracing::info!(
                    from = %from,
                    to = %to,
                    error = %primary,
                    "Transfer failed, locks released"
                );
                Err(primary)
            }
            (Err(primary), Err(release)) => Err(WalletError::ReleaseAfterFailure {
                primary: Box::new(primary),
                release: Box::new(release),
            }),
        }
    }

    async fn acquire(&self, from: &str, to: &str) -> Result<(), WalletError> {
        match self.store.set_lock(from, to, true).await {
            Ok(()) => {
                tracing::debug!(from = %from, to = %to, "Transfer locks acquired");
                Ok(())
            }
            Err(StoreError::RowCount { affected, .. }) => {
                tracing::info!(
                    from = %from,
                    to = %to,
                    affected,
                    "Transfer lock conflict"
                );
                Err(WalletError::LockConflict {
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, from: &str, to: &str, phase: TransferPhase) -> Result<(), WalletError> {
        self.store.set_lock(from, to, false).await.map_err(|source| {
            tracing::error!(
                alert = true,
                from = %from,
                to = %to,
                phase = %phase,
                error = %source,
                "Transfer locks left set, operator release required"
            );
            WalletError::LockReleaseFailed {
                from: from.to_string(),
                to: to.to_string(),
                phase,
                source,
            }
        })
    }
}

/// Phase 3 failures: a rejected debit is insufficient funds, a missing row
/// is an update conflict, anything else is passed through.
fn classify_movement(err: StoreError, from: &str) -> WalletError {
    match err {
        StoreError::InsufficientFunds(account) => WalletError::InsufficientFunds { account },
        StoreError::RowCount { .. } => WalletError::UpdateConflict(from.to_string()),
        other => other.into(),
    }
}
