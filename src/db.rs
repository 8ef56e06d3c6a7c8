//! Database module
//!
//! Pool construction and startup checks. The schema itself lives in raw SQL
//! files under `migrations/`.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::config::Config;

/// Tables the ledger store reads and writes
const REQUIRED_TABLES: &[&str] = &["wallets", "transactions"];

/// Build the connection pool.
///
/// Every connection carries the configured `statement_timeout`, so a stuck
/// row lock surfaces as a store error instead of hanging a request.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let statement_timeout = config.database_statement_timeout.as_millis().to_string();
    let options = PgConnectOptions::from_str(&config.database_url)?
        .options([("statement_timeout", statement_timeout.as_str())]);

    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.database_acquire_timeout)
        .connect_with(options)
        .await
}

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    let has_locked_at: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.columns
            WHERE table_schema = 'public' AND table_name = 'wallets' AND column_name = 'locked_at'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !has_locked_at {
        tracing::error!("Column 'wallets.locked_at' does not exist");
        return Ok(false);
    }

    // The ledger relies on these checks for overdraft protection
    let constraints: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM information_schema.check_constraints
        WHERE constraint_name IN ('wallets_balance_non_negative', 'wallets_transfer_lock_flag')
        "#,
    )
    .fetch_one(pool)
    .await?;

    if constraints < 2 {
        tracing::error!("Wallet check constraints are missing; run migrations/0001_init.sql");
        return Ok(false);
    }

    tracing::info!("Ledger schema verified");
    Ok(true)
}
