//! PostgreSQL Store Integration Tests
//!
//! Need a live database: set `DATABASE_URL` and run
//! `cargo test --test integration_store -- --ignored --test-threads=1`.

use std::sync::Arc;

use wallet_ledger::domain::{Identity, OperationContext, TransferLock, WalletError};
use wallet_ledger::handlers::{
    CreateWalletHandler, TopUpCommand, TopUpHandler, TransferCommand, TransferHandler,
};
use wallet_ledger::store::{LedgerStore, PgLedgerStore, StoreError};

mod common;

use common::{ALICE, BOB};

async fn store() -> Arc<PgLedgerStore> {
    Arc::new(PgLedgerStore::new(common::setup_test_db().await))
}

#[tokio::test]
#[ignore]
async fn test_account_numbers_are_sequential() {
    let store = store().await;
    let handler = CreateWalletHandler::new(store.clone());
    let context = OperationContext::new(Identity::user(ALICE));

    let first = handler.execute(&context).await.unwrap();
    let second = handler.execute(&context).await.unwrap();

    assert_eq!(first.account_no, "KZT0000000001");
    assert_eq!(second.account_no, "KZT0000000002");
    assert_eq!(
        store.latest_account_number().await.unwrap().as_deref(),
        Some("KZT0000000002")
    );
}

#[tokio::test]
#[ignore]
async fn test_duplicate_account_number_is_unique_violation() {
    let store = store().await;
    store.create_account("KZT0000000001", ALICE).await.unwrap();

    let err = store.create_account("KZT0000000001", BOB).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));
}

#[tokio::test]
#[ignore]
async fn test_lock_needs_both_rows_idle() {
    let store = store().await;
    store.create_account("KZT0000000001", ALICE).await.unwrap();
    store.create_account("KZT0000000002", BOB).await.unwrap();
    store.create_account("KZT0000000003", BOB).await.unwrap();

    store
        .set_lock("KZT0000000001", "KZT0000000002", true)
        .await
        .unwrap();

    // Shares a locked row: only one of two rows matches, nothing changes
    let err = store
        .set_lock("KZT0000000003", "KZT0000000002", true)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RowCount { expected: 2, affected: 1 }));

    let locked: Vec<String> = store
        .locked_accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.account_no)
        .collect();
    assert_eq!(locked, vec!["KZT0000000001", "KZT0000000002"]);

    // Unknown account matches a single row
    let err = store
        .set_lock("KZT0000000003", "KZT0000009999", true)
        .await
        .unwrap_err();
    assert!(err.is_row_count());
}

#[tokio::test]
#[ignore]
async fn test_overdraft_hits_check_constraint() {
    let store = store().await;
    store.create_account("KZT0000000001", ALICE).await.unwrap();
    store.create_account("KZT0000000002", BOB).await.unwrap();
    store.apply_top_up("KZT0000000001", 100).await.unwrap();

    let err = store
        .apply_transfer("KZT0000000001", "KZT0000000002", 101)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InsufficientFunds(_)));

    assert_eq!(store.balance("KZT0000000001").await.unwrap(), 100);
    assert_eq!(store.balance("KZT0000000002").await.unwrap(), 0);
    // Only the top-up was recorded
    assert_eq!(store.list_transactions("KZT0000000001").await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_other_check_constraints_are_not_insufficient_funds() {
    let store = store().await;

    let err = store.create_account("BAD0000000001", ALICE).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)), "{:?}", err);
}

#[tokio::test]
#[ignore]
async fn test_top_up_past_bigint_is_balance_overflow() {
    let store = store().await;
    store.create_account("KZT0000000001", ALICE).await.unwrap();
    store.apply_top_up("KZT0000000001", i64::MAX).await.unwrap();

    let err = store.apply_top_up("KZT0000000001", 1).await.unwrap_err();
    assert!(matches!(err, StoreError::BalanceOverflow(_)), "{:?}", err);
    assert_eq!(store.balance("KZT0000000001").await.unwrap(), i64::MAX);
    assert_eq!(store.list_transactions("KZT0000000001").await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_locked_at_is_set_with_the_lock_only() {
    let store = store().await;
    store.create_account("KZT0000000001", ALICE).await.unwrap();
    store.create_account("KZT0000000002", BOB).await.unwrap();

    store
        .set_lock("KZT0000000001", "KZT0000000002", true)
        .await
        .unwrap();
    let locked = store.locked_accounts().await.unwrap();
    let locked_at = locked[0].locked_at.expect("lock time recorded");

    store.apply_top_up("KZT0000000001", 10).await.unwrap();
    let after_top_up = store.locked_accounts().await.unwrap();
    assert_eq!(after_top_up[0].locked_at, Some(locked_at));

    store
        .set_lock("KZT0000000001", "KZT0000000002", false)
        .await
        .unwrap();
    let wallets = store.accounts_by_owner(ALICE).await.unwrap();
    assert!(wallets[0].locked_at.is_none());
}

#[tokio::test]
#[ignore]
async fn test_transfer_end_to_end() {
    let store = store().await;
    let create = CreateWalletHandler::new(store.clone());
    let alice = OperationContext::new(Identity::user(ALICE));
    let bob = OperationContext::new(Identity::user(BOB));

    let a = create.execute(&alice).await.unwrap().account_no;
    let b = create.execute(&bob).await.unwrap().account_no;

    let top_up = TopUpHandler::new(store.clone());
    top_up.execute(TopUpCommand::new(&a, "500"), &alice).await.unwrap();
    top_up.execute(TopUpCommand::new(&b, "700"), &bob).await.unwrap();

    let transfer = TransferHandler::new(store.clone());
    transfer
        .execute(TransferCommand::new(&a, &b, "200"), &alice)
        .await
        .unwrap();

    assert_eq!(store.balance(&a).await.unwrap(), 300);
    assert_eq!(store.balance(&b).await.unwrap(), 900);

    let wallets = store.accounts_by_owner(ALICE).await.unwrap();
    assert_eq!(wallets[0].transfer_lock, TransferLock::Idle);

    let err = transfer
        .execute(TransferCommand::new(&a, &b, "301"), &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::InsufficientFunds { .. }));
    assert!(store.locked_accounts().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn test_concurrent_transfers_conserve_funds() {
    let store = store().await;
    store.create_account("KZT0000000001", ALICE).await.unwrap();
    store.create_account("KZT0000000002", BOB).await.unwrap();
    store.apply_top_up("KZT0000000001", 50).await.unwrap();

    let handler = Arc::new(TransferHandler::new(store.clone()));
    let mut tasks = Vec::new();
    for _ in 0..20 {
        let handler = handler.clone();
        tasks.push(tokio::spawn(async move {
            let context = OperationContext::new(Identity::user(ALICE));
            handler
                .execute(
                    TransferCommand::new("KZT0000000001", "KZT0000000002", "5"),
                    &context,
                )
                .await
        }));
    }

    let mut succeeded = 0i64;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(WalletError::LockConflict { .. }) | Err(WalletError::InsufficientFunds { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let from = store.balance("KZT0000000001").await.unwrap();
    let to = store.balance("KZT0000000002").await.unwrap();
    assert_eq!(from + to, 50);
    assert_eq!(to, succeeded * 5);
    assert!(store.locked_accounts().await.unwrap().is_empty());
}
