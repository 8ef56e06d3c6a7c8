//! Scenario tests across handlers
//!
//! Run against the in-memory store; the PostgreSQL store has its own tests
//! under `tests/`.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::domain::{
        Identity, OperationContext, TransactionKind, TransactionRecord, TransferLock, Wallet,
        WalletError,
    };
    use crate::handlers::{
        CreateWalletHandler, QueryHandler, TopUpCommand, TopUpHandler, TransferCommand,
        TransferHandler,
    };
    use crate::store::{InMemoryLedgerStore, LedgerStore, StoreError};

    const ALICE: &str = "910815450350";
    const BOB: &str = "850101300123";

    fn user(iin: &str) -> OperationContext {
        OperationContext::new(Identity::user(iin))
    }

    // =========================================================================
    // Full wallet lifecycle
    // =========================================================================

    #[tokio::test]
    async fn test_create_top_up_transfer_and_read_history() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let create = CreateWalletHandler::new(store.clone());
        let top_up = TopUpHandler::new(store.clone());
        let transfer = TransferHandler::new(store.clone());
        let query = QueryHandler::new(store.clone());

        let a = create.execute(&user(ALICE)).await.unwrap().account_no;
        let b = create.execute(&user(BOB)).await.unwrap().account_no;
        assert!(b > a);

        top_up
            .execute(TopUpCommand::new(&a, "500"), &user(ALICE))
            .await
            .unwrap();
        top_up
            .execute(TopUpCommand::new(&b, "700"), &user(BOB))
            .await
            .unwrap();

        transfer
            .execute(TransferCommand::new(&a, &b, "200"), &user(ALICE))
            .await
            .unwrap();

        assert_eq!(store.balance(&a).await.unwrap(), 300);
        assert_eq!(store.balance(&b).await.unwrap(), 900);

        let history = query.get_transactions(&user(BOB), &b).await.unwrap();
        let kinds: Vec<TransactionKind> = history.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TransactionKind::TopUp, TransactionKind::Transfer]);
        assert_eq!(history[1].from_account, a);
        assert_eq!(history[1].amount, 200);

        // Every committed balance mutation has exactly one record
        assert_eq!(store.transactions().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_transfers_leave_no_trace() {
        let store = Arc::new(InMemoryLedgerStore::new());
        store.seed_wallet("KZT0000000001", ALICE, 100).unwrap();
        store.seed_wallet("KZT0000000002", BOB, 0).unwrap();
        let transfer = TransferHandler::new(store.clone());

        let attempts = [
            (user(BOB), "10"),   // not the owner
            (user(ALICE), "abc"), // bad amount
            (user(ALICE), "101"), // overdraft
        ];
        for (context, amount) in attempts {
            let result = transfer
                .execute(
                    TransferCommand::new("KZT0000000001", "KZT0000000002", amount),
                    &context,
                )
                .await;
            assert!(result.is_err());
        }

        assert_eq!(store.wallet("KZT0000000001").unwrap().balance, 100);
        assert_eq!(store.wallet("KZT0000000002").unwrap().balance, 0);
        assert!(store.locked_accounts().await.unwrap().is_empty());
        assert!(store.transactions().is_empty());
    }

    // =========================================================================
    // Concurrent transfers sharing a wallet
    // =========================================================================

    /// Parks every transfer inside phase 3 until released by the test.
    struct GatedStore {
        inner: InMemoryLedgerStore,
        entered: Notify,
        proceed: Notify,
        in_movement: AtomicUsize,
        max_in_movement: AtomicUsize,
    }

    impl GatedStore {
        fn new(inner: InMemoryLedgerStore) -> Self {
            Self {
                inner,
                entered: Notify::new(),
                proceed: Notify::new(),
                in_movement: AtomicUsize::new(0),
                max_in_movement: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LedgerStore for GatedStore {
        async fn latest_account_number(&self) -> Result<Option<String>, StoreError> {
            self.inner.latest_account_number().await
        }
        async fn create_account(&self, a: &str, o: &str) -> Result<(), StoreError> {
            self.inner.create_account(a, o).await
        }
        async fn accounts_by_owner(&self, o: &str) -> Result<Vec<Wallet>, StoreError> {
            self.inner.accounts_by_owner(o).await
        }
        async fn account_numbers_by_owner(&self, o: &str) -> Result<Vec<String>, StoreError> {
            self.inner.account_numbers_by_owner(o).await
        }
        async fn balance(&self, a: &str) -> Result<i64, StoreError> {
            self.inner.balance(a).await
        }
        async fn owner_matches(&self, o: &str, a: &str) -> Result<bool, StoreError> {
            self.inner.owner_matches(o, a).await
        }
        async fn apply_top_up(&self, a: &str, amount: i64) -> Result<(), StoreError> {
            self.inner.apply_top_up(a, amount).await
        }
        async fn set_lock(&self, a: &str, b: &str, locked: bool) -> Result<(), StoreError> {
            self.inner.set_lock(a, b, locked).await
        }
        async fn apply_transfer(&self, f: &str, t: &str, amount: i64) -> Result<(), StoreError> {
            let now = self.in_movement.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_movement.fetch_max(now, Ordering::SeqCst);
            self.entered.notify_one();
            self.proceed.notified().await;
            let result = self.inner.apply_transfer(f, t, amount).await;
            self.in_movement.fetch_sub(1, Ordering::SeqCst);
            result
        }
        async fn list_transactions(&self, a: &str) -> Result<Vec<TransactionRecord>, StoreError> {
            self.inner.list_transactions(a).await
        }
        async fn locked_accounts(&self) -> Result<Vec<Wallet>, StoreError> {
            self.inner.locked_accounts().await
        }
        async fn release_lock(&self, a: &str) -> Result<(), StoreError> {
            self.inner.release_lock(a).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_transfer_on_shared_wallet_gets_lock_conflict() {
        let inner = InMemoryLedgerStore::new();
        inner.seed_wallet("KZT0000000001", ALICE, 500).unwrap();
        inner.seed_wallet("KZT0000000002", BOB, 0).unwrap();
        inner.seed_wallet("KZT0000000003", ALICE, 100).unwrap();
        let store = Arc::new(GatedStore::new(inner));
        let handler = Arc::new(TransferHandler::new(store.clone()));

        let first = {
            let handler = handler.clone();
            tokio::spawn(async move {
                handler
                    .execute(
                        TransferCommand::new("KZT0000000001", "KZT0000000002", "200"),
                        &user(ALICE),
                    )
                    .await
            })
        };

        // First transfer now sits in phase 3 holding both locks
        store.entered.notified().await;
        assert_eq!(
            store.inner.wallet("KZT0000000002").unwrap().transfer_lock,
            TransferLock::Locked
        );

        let second = handler
            .execute(
                TransferCommand::new("KZT0000000003", "KZT0000000002", "50"),
                &user(ALICE),
            )
            .await;
        assert!(matches!(second, Err(WalletError::LockConflict { .. })));

        store.proceed.notify_one();
        first.await.unwrap().unwrap();

        assert_eq!(store.max_in_movement.load(Ordering::SeqCst), 1);
        assert_eq!(store.inner.wallet("KZT0000000001").unwrap().balance, 300);
        assert_eq!(store.inner.wallet("KZT0000000002").unwrap().balance, 200);
        assert_eq!(store.inner.wallet("KZT0000000003").unwrap().balance, 100);
        assert!(store.locked_accounts().await.unwrap().is_empty());
        assert_eq!(store.inner.transactions().len(), 1);
    }
}
