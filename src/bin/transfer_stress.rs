//! Transfer Stress Tool
//!
//! Fires concurrent transfers that share a wallet against PostgreSQL and
//! checks that no funds are created or lost.
//!
//! Run with: cargo run --bin transfer_stress --release -- --transfers 200

use std::sync::Arc;
use std::time::Instant;

use wallet_ledger::domain::{Identity, OperationContext, WalletError};
use wallet_ledger::handlers::{
    CreateWalletHandler, TopUpCommand, TopUpHandler, TransferCommand, TransferHandler,
};
use wallet_ledger::store::{LedgerStore, PgLedgerStore};
use wallet_ledger::{db, Config};

const STRESS_OWNER: &str = "000000000001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();
    let transfer_count: usize = args
        .iter()
        .position(|a| a == "--transfers")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(200);

    let config = Config::from_env()?;

    println!("Transfer Stress - {} concurrent transfers", transfer_count);
    println!("Connecting to database...");

    let pool = db::connect(&config).await?;
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
    let context = OperationContext::new(Identity::user(STRESS_OWNER));

    let create = CreateWalletHandler::new(store.clone());
    let source = create.execute(&context).await?.account_no;
    let target = create.execute(&context).await?.account_no;

    let funded = transfer_count as i64;
    TopUpHandler::new(store.clone())
        .execute(TopUpCommand::new(&source, funded.to_string()), &context)
        .await?;

    println!("Source {} funded with {}, target {}", source, funded, target);

    let handler = Arc::new(TransferHandler::new(store.clone()));
    let start = Instant::now();

    let mut tasks = Vec::with_capacity(transfer_count);
    for i in 0..transfer_count {
        let handler = handler.clone();
        let context = context.clone();
        // Alternate direction so both wallets are contended
        let (from, to) = if i % 2 == 0 {
            (source.clone(), target.clone())
        } else {
            (target.clone(), source.clone())
        };
        tasks.push(tokio::spawn(async move {
            handler
                .execute(TransferCommand::new(from, to, "1"), &context)
                .await
        }));
    }

    let mut succeeded = 0u64;
    let mut lock_conflicts = 0u64;
    let mut insufficient = 0u64;
    let mut other = 0u64;

    for task in tasks {
        match task.await? {
            Ok(_) => succeeded += 1,
            Err(WalletError::LockConflict { .. }) => lock_conflicts += 1,
            Err(WalletError::InsufficientFunds { .. }) => insufficient += 1,
            Err(e) => {
                eprintln!("Unexpected failure: {}", e);
                other += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    let total = store.balance(&source).await? + store.balance(&target).await?;
    let still_locked = store
        .locked_accounts()
        .await?
        .into_iter()
        .filter(|w| w.account_no == source || w.account_no == target)
        .count();

    println!("\n=== Transfer Stress Results ===");
    println!("Transfers: {}", transfer_count);
    println!("Succeeded: {}", succeeded);
    println!("Lock conflicts: {}", lock_conflicts);
    println!("Insufficient funds: {}", insufficient);
    println!("Other failures: {}", other);
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Balance total: {} (expected {})", total, funded);
    println!("Wallets left locked: {}", still_locked);

    pool.close().await;

    if total != funded || still_locked != 0 {
        anyhow::bail!("ledger invariant violated");
    }

    Ok(())
}
