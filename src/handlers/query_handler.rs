//! Query Handler
//!
//! Read-only wallet and transaction lookups.

use std::sync::Arc;

use crate::domain::{OperationContext, TransactionRecord, Wallet, WalletError};
use crate::store::LedgerStore;

use super::ensure_owner;

/// Handler for wallet and transaction queries
pub struct QueryHandler {
    store: Arc<dyn LedgerStore>,
}

impl QueryHandler {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Full wallet rows of the resolved owner
    pub async fn get_wallets(
        &self,
        context: &OperationContext,
        target_iin: Option<&str>,
    ) -> Result<Vec<Wallet>, WalletError> {
        let owner = resolve_owner(context, target_iin)?;
        Ok(self.store.accounts_by_owner(owner).await?)
    }

    /// Account numbers of the resolved owner
    pub async fn get_wallet_list(
        &self,
        context: &OperationContext,
        target_iin: Option<&str>,
    ) -> Result<Vec<String>, WalletError> {
        let owner = resolve_owner(context, target_iin)?;
        Ok(self.store.account_numbers_by_owner(owner).await?)
    }

    /// Transaction history of one account.
    ///
    /// Non-admin callers must own the account.
    pub async fn get_transactions(
        &self,
        context: &OperationContext,
        account_no: &str,
    ) -> Result<Vec<TransactionRecord>, WalletError> {
        if !context.is_admin() {
            ensure_owner(self.store.as_ref(), context.subject_id(), account_no).await?;
        }
        Ok(self.store.list_transactions(account_no).await?)
    }
}

/// Owner whose wallets a read targets.
///
/// Admins may name anyone; everybody else may only name themselves.
fn resolve_owner<'a>(
    context: &'a OperationContext,
    target_iin: Option<&'a str>,
) -> Result<&'a str, WalletError> {
    match target_iin.map(str::trim).filter(|t| !t.is_empty()) {
        None => Ok(context.subject_id()),
        Some(target) if context.is_admin() || target == context.subject_id() => Ok(target),
        Some(_) => Err(WalletError::OwnershipMismatch),
    }
}
