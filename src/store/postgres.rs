//! PostgreSQL Ledger Store
//!
//! `LedgerStore` over the `wallets` and `transactions` tables. The
//! non-negative balance invariant is enforced by a CHECK constraint, so an
//! overdrawing debit fails inside the transaction and nothing is committed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{TransactionKind, TransactionRecord, TransferLock, Wallet};

use super::{LedgerStore, StoreError};

/// SQLSTATE for CHECK constraint violations
const CHECK_VIOLATION: &str = "23514";

/// SQLSTATE for UNIQUE constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for numeric value out of range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// CHECK constraint guarding the non-negative balance
const BALANCE_CONSTRAINT: &str = "wallets_balance_non_negative";

type WalletRow = (
    i64,
    String,
    String,
    i64,
    i16,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    DateTime<Utc>,
);

type TransactionRow = (i64, String, String, String, i64, DateTime<Utc>);

/// Ledger store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Create a new store with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn wallet_from_row(row: WalletRow) -> Result<Wallet, StoreError> {
        let (id, account_no, owner_iin, balance, flag, locked_at, created_at, updated_at) = row;
        let transfer_lock = TransferLock::from_flag(flag).ok_or_else(|| {
            StoreError::Corrupt(format!("transfer_lock={} on {}", flag, account_no))
        })?;

        Ok(Wallet {
            id,
            account_no,
            owner_iin,
            balance,
            transfer_lock,
            locked_at,
            created_at,
            updated_at,
        })
    }

    fn transaction_from_row(row: TransactionRow) -> Result<TransactionRecord, StoreError> {
        let (id, kind, from_account, to_account, amount, created_at) = row;
        let kind = TransactionKind::parse(&kind)
            .ok_or_else(|| StoreError::Corrupt(format!("transfer_type={} on #{}", kind, id)))?;

        Ok(TransactionRecord {
            id,
            kind,
            from_account,
            to_account,
            amount,
            created_at,
        })
    }
}

/// Translate constraint violations into store errors naming the account
fn classify(err: sqlx::Error, account_no: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(CHECK_VIOLATION) if db_err.constraint() == Some(BALANCE_CONSTRAINT) => {
                return StoreError::InsufficientFunds(account_no.to_string())
            }
            Some(UNIQUE_VIOLATION) => return StoreError::UniqueViolation(account_no.to_string()),
            Some(NUMERIC_OUT_OF_RANGE) => {
                return StoreError::BalanceOverflow(account_no.to_string())
            }
            _ => {}
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn latest_account_number(&self) -> Result<Option<String>, StoreError> {
        let account_no: Option<String> =
            sqlx::query_scalar("SELECT account_no FROM wallets ORDER BY id DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(account_no)
    }

    async fn create_account(&self, account_no: &str, owner_iin: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (account_no, iin, balance, transfer_lock, created_at, updated_at)
            VALUES ($1, $2, 0, 0, NOW(), NOW())
            "#,
        )
        .bind(account_no)
        .bind(owner_iin)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, account_no))?;

        Ok(())
    }

    async fn accounts_by_owner(&self, owner_iin: &str) -> Result<Vec<Wallet>, StoreError> {
        let rows: Vec<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, account_no, iin, balance, transfer_lock, locked_at, created_at, updated_at
            FROM wallets
            WHERE iin = $1
            ORDER BY id
            "#,
        )
        .bind(owner_iin)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::wallet_from_row).collect()
    }

    async fn account_numbers_by_owner(&self, owner_iin: &str) -> Result<Vec<String>, StoreError> {
        let accounts: Vec<String> =
            sqlx::query_scalar("SELECT account_no FROM wallets WHERE iin = $1 ORDER BY id")
                .bind(owner_iin)
                .fetch_all(&self.pool)
                .await?;

        Ok(accounts)
    }

    async fn balance(&self, account_no: &str) -> Result<i64, StoreError> {
        let balance: Option<i64> =
            sqlx::query_scalar("SELECT balance FROM wallets WHERE account_no = $1")
                .bind(account_no)
                .fetch_optional(&self.pool)
                .await?;

        balance.ok_or_else(|| StoreError::NotFound(account_no.to_string()))
    }

    async fn owner_matches(&self, owner_iin: &str, account_no: &str) -> Result<bool, StoreError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT iin FROM wallets WHERE account_no = $1")
                .bind(account_no)
                .fetch_optional(&self.pool)
                .await?;

        let stored = stored.ok_or_else(|| StoreError::NotFound(account_no.to_string()))?;
        Ok(stored == owner_iin)
    }

    async fn apply_top_up(&self, account_no: &str, amount: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, updated_at = NOW() WHERE account_no = $2",
        )
        .bind(amount)
        .bind(account_no)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, account_no))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            tracing::error!(account = %account_no, "Top-up balance update affected no rows");
            return Err(StoreError::RowCount {
                expected: 1,
                affected: 0,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (transfer_type, from_acc, to_acc, amount, created_at)
            VALUES ($1, '', $2, $3, NOW())
            "#,
        )
        .bind(TransactionKind::TopUp.as_str())
        .bind(account_no)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_lock(
        &self,
        account_a: &str,
        account_b: &str,
        locked: bool,
    ) -> Result<(), StoreError> {
        let (target, current) = if locked {
            (TransferLock::Locked, TransferLock::Idle)
        } else {
            (TransferLock::Idle, TransferLock::Locked)
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET transfer_lock = $1,
                locked_at = CASE WHEN $1 = 1 THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE (account_no = $2 OR account_no = $3) AND transfer_lock = $4
            "#,
        )
        .bind(target.as_flag())
        .bind(account_a)
        .bind(account_b)
        .bind(current.as_flag())
        .execute(&mut *tx)
        .await?;

        let affected = result.rows_affected();
        if affected != 2 {
            tx.rollback().await?;
            tracing::warn!(
                account_a = %account_a,
                account_b = %account_b,
                locked,
                affected,
                "Soft lock update did not touch both rows"
            );
            return Err(StoreError::RowCount {
                expected: 2,
                affected,
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn apply_transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let debit = sqlx::query(
            "UPDATE wallets SET balance = balance - $1, updated_at = NOW() WHERE account_no = $2",
        )
        .bind(amount)
        .bind(from)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, from))?;

        if debit.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::RowCount {
                expected: 1,
                affected: debit.rows_affected(),
            });
        }

        let credit = sqlx::query(
            "UPDATE wallets SET balance = balance + $1, updated_at = NOW() WHERE account_no = $2",
        )
        .bind(amount)
        .bind(to)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, to))?;

        if credit.rows_affected() != 1 {
            tx.rollback().await?;
            return Err(StoreError::RowCount {
                expected: 1,
                affected: credit.rows_affected(),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO transactions (transfer_type, from_acc, to_acc, amount, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(TransactionKind::Transfer.as_str())
        .bind(from)
        .bind(to)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(from = %from, to = %to, amount, "Transfer rows committed");
        Ok(())
    }

    async fn list_transactions(
        &self,
        account_no: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, transfer_type, from_acc, to_acc, amount, created_at
            FROM transactions
            WHERE from_acc = $1 OR to_acc = $1
            ORDER BY id
            "#,
        )
        .bind(account_no)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::transaction_from_row).collect()
    }

    async fn locked_accounts(&self) -> Result<Vec<Wallet>, StoreError> {
        let rows: Vec<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, account_no, iin, balance, transfer_lock, locked_at, created_at, updated_at
            FROM wallets
            WHERE transfer_lock = $1
            ORDER BY locked_at, id
            "#,
        )
        .bind(TransferLock::Locked.as_flag())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::wallet_from_row).collect()
    }

    async fn release_lock(&self, account_no: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE wallets
            SET transfer_lock = $1, locked_at = NULL, updated_at = NOW()
            WHERE account_no = $2 AND transfer_lock = $3
            "#,
        )
        .bind(TransferLock::Idle.as_flag())
        .bind(account_no)
        .bind(TransferLock::Locked.as_flag())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != 1 {
            return Err(StoreError::RowCount {
                expected: 1,
                affected: result.rows_affected(),
            });
        }

        Ok(())
    }
}
