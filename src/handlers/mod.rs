//! Command Handlers module
//!
//! Use cases invoked by the API layer once the authorization gate has
//! produced an `OperationContext`. Every handler goes through the
//! `LedgerStore` on each call and caches nothing between calls.

mod commands;
mod query_handler;
mod reconcile_handler;
mod topup_handler;
mod transfer_handler;
mod wallet_handler;

#[cfg(test)]
mod tests;

pub use commands::*;
pub use query_handler::QueryHandler;
pub use reconcile_handler::LockReconciliationHandler;
pub use topup_handler::TopUpHandler;
pub use transfer_handler::TransferHandler;
pub use wallet_handler::{CreateWalletHandler, DEFAULT_MAX_ATTEMPTS};

use crate::domain::WalletError;
use crate::store::LedgerStore;

/// Fail with `OwnershipMismatch` unless `owner_iin` owns `account_no`.
pub(crate) async fn ensure_owner(
    store: &dyn LedgerStore,
    owner_iin: &str,
    account_no: &str,
) -> Result<(), WalletError> {
    if store.owner_matches(owner_iin, account_no).await? {
        Ok(())
    } else {
        Err(WalletError::OwnershipMismatch)
    }
}
