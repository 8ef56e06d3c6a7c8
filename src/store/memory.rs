//! In-memory Ledger Store
//!
//! A `LedgerStore` held in process memory, used by unit and router tests.
//! Each call takes the state mutex once, so every method is atomic in the
//! same way a single store transaction is. Individual calls can be armed to
//! fail once, to exercise the compensating paths of the transfer protocol.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use crate::domain::{TransactionKind, TransactionRecord, TransferLock, Wallet};

use super::{LedgerStore, StoreError};

/// Store calls that can be armed to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    CreateAccount,
    ApplyTopUp,
    AcquireLock,
    ApplyTransfer,
    ReleaseLock,
}

#[derive(Debug, Default)]
struct State {
    wallets: Vec<Wallet>,
    transactions: Vec<TransactionRecord>,
    next_wallet_id: i64,
    next_transaction_id: i64,
    armed: HashSet<FaultPoint>,
}

impl State {
    fn trip(&mut self, point: FaultPoint) -> Result<(), StoreError> {
        if self.armed.remove(&point) {
            return Err(StoreError::Unavailable(format!("injected fault at {:?}", point)));
        }
        Ok(())
    }

    fn position(&self, account_no: &str) -> Option<usize> {
        self.wallets.iter().position(|w| w.account_no == account_no)
    }

    fn push_transaction(&mut self, kind: TransactionKind, from: &str, to: &str, amount: i64) {
        self.next_transaction_id += 1;
        self.transactions.push(TransactionRecord {
            id: self.next_transaction_id,
            kind,
            from_account: from.to_string(),
            to_account: to.to_string(),
            amount,
            created_at: Utc::now(),
        });
    }
}

/// Ledger store kept in memory
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: Mutex<State>,
}

impl InMemoryLedgerStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("state mutex poisoned".to_string()))
    }

    /// Insert a wallet with an initial balance, bypassing the transaction log
    pub fn seed_wallet(&self, account_no: &str, owner_iin: &str, balance: i64) -> Result<(), StoreError> {
        let mut state = self.state()?;
        if state.position(account_no).is_some() {
            return Err(StoreError::UniqueViolation(account_no.to_string()));
        }
        state.next_wallet_id += 1;
        let now = Utc::now();
        let wallet = Wallet {
            id: state.next_wallet_id,
            account_no: account_no.to_string(),
            owner_iin: owner_iin.to_string(),
            balance,
            transfer_lock: TransferLock::Idle,
            locked_at: None,
            created_at: now,
            updated_at: now,
        };
        state.wallets.push(wallet);
        Ok(())
    }

    /// Arm a one-shot failure for the next call at `point`
    pub fn fail_next(&self, point: FaultPoint) -> Result<(), StoreError> {
        self.state()?.armed.insert(point);
        Ok(())
    }

    /// Snapshot of one wallet row
    pub fn wallet(&self, account_no: &str) -> Option<Wallet> {
        let state = self.state().ok()?;
        state.position(account_no).map(|i| state.wallets[i].clone())
    }

    /// Snapshot of the whole transaction log
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.state()
            .map(|state| state.transactions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn latest_account_number(&self) -> Result<Option<String>, StoreError> {
        let state = self.state()?;
        Ok(state
            .wallets
            .iter()
            .max_by_key(|w| w.id)
            .map(|w| w.account_no.clone()))
    }

    async fn create_account(&self, account_no: &str, owner_iin: &str) -> Result<(), StoreError> {
        self.state()?.trip(FaultPoint::CreateAccount)?;
        self.seed_wallet(account_no, owner_iin, 0)
    }

    async fn accounts_by_owner(&self, owner_iin: &str) -> Result<Vec<Wallet>, StoreError> {
        let state = self.state()?;
        Ok(state
            .wallets
            .iter()
            .filter(|w| w.owner_iin == owner_iin)
            .cloned()
            .collect())
    }

    async fn account_numbers_by_owner(&self, owner_iin: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state()?;
        Ok(state
            .wallets
            .iter()
            .filter(|w| w.owner_iin == owner_iin)
            .map(|w| w.account_no.clone())
            .collect())
    }

    async fn balance(&self, account_no: &str) -> Result<i64, StoreError> {
        let state = self.state()?;
        state
            .position(account_no)
            .map(|i| state.wallets[i].balance)
            .ok_or_else(|| StoreError::NotFound(account_no.to_string()))
    }

    async fn owner_matches(&self, owner_iin: &str, account_no: &str) -> Result<bool, StoreError> {
        let state = self.state()?;
        state
            .position(account_no)
            .map(|i| state.wallets[i].owner_iin == owner_iin)
            .ok_or_else(|| StoreError::NotFound(account_no.to_string()))
    }

    async fn apply_top_up(&self, account_no: &str, amount: i64) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.trip(FaultPoint::ApplyTopUp)?;

        let index = state.position(account_no).ok_or(StoreError::RowCount {
            expected: 1,
            affected: 0,
        })?;

        let wallet = &mut state.wallets[index];
        wallet.balance = wallet
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::BalanceOverflow(account_no.to_string()))?;
        wallet.updated_at = Utc::now();

        state.push_transaction(TransactionKind::TopUp, "", account_no, amount);
        Ok(())
    }

    async fn set_lock(
        &self,
        account_a: &str,
        account_b: &str,
        locked: bool,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        let (target, current) = if locked {
            state.trip(FaultPoint::AcquireLock)?;
            (TransferLock::Locked, TransferLock::Idle)
        } else {
            state.trip(FaultPoint::ReleaseLock)?;
            (TransferLock::Idle, TransferLock::Locked)
        };

        let matching: Vec<usize> = state
            .wallets
            .iter()
            .enumerate()
            .filter(|(_, w)| {
                (w.account_no == account_a || w.account_no == account_b)
                    && w.transfer_lock == current
            })
            .map(|(i, _)| i)
            .collect();

        if matching.len() != 2 {
            return Err(StoreError::RowCount {
                expected: 2,
                affected: matching.len() as u64,
            });
        }

        let now = Utc::now();
        for index in matching {
            let wallet = &mut state.wallets[index];
            wallet.transfer_lock = target;
            wallet.locked_at = locked.then_some(now);
            wallet.updated_at = now;
        }
        Ok(())
    }

    async fn apply_transfer(&self, from: &str, to: &str, amount: i64) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.trip(FaultPoint::ApplyTransfer)?;

        let missing = StoreError::RowCount {
            expected: 1,
            affected: 0,
        };
        let from_index = state.position(from).ok_or(missing)?;
        let to_index = state.position(to).ok_or(StoreError::RowCount {
            expected: 1,
            affected: 0,
        })?;

        let debited = state.wallets[from_index].balance - amount;
        if debited < 0 {
            return Err(StoreError::InsufficientFunds(from.to_string()));
        }
        let credited = state.wallets[to_index]
            .balance
            .checked_add(amount)
            .ok_or_else(|| StoreError::BalanceOverflow(to.to_string()))?;

        let now = Utc::now();
        state.wallets[from_index].balance = debited;
        state.wallets[from_index].updated_at = now;
        state.wallets[to_index].balance = credited;
        state.wallets[to_index].updated_at = now;

        state.push_transaction(TransactionKind::Transfer, from, to, amount);
        Ok(())
    }

    async fn list_transactions(
        &self,
        account_no: &str,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let state = self.state()?;
        Ok(state
            .transactions
            .iter()
            .filter(|t| t.from_account == account_no || t.to_account == account_no)
            .cloned()
            .collect())
    }

    async fn locked_accounts(&self) -> Result<Vec<Wallet>, StoreError> {
        let state = self.state()?;
        let mut locked: Vec<Wallet> = state
            .wallets
            .iter()
            .filter(|w| w.transfer_lock.is_locked())
            .cloned()
            .collect();
        locked.sort_by_key(|w| (w.locked_at, w.id));
        Ok(locked)
    }

    async fn release_lock(&self, account_no: &str) -> Result<(), StoreError> {
        let mut state = self.state()?;
        match state.position(account_no) {
            Some(index) if state.wallets[index].transfer_lock.is_locked() => {
                state.wallets[index].transfer_lock = TransferLock::Idle;
                state.wallets[index].locked_at = None;
                state.wallets[index].updated_at = Utc::now();
                Ok(())
            }
            _ => Err(StoreError::RowCount {
                expected: 1,
                affected: 0,
            }),
        }
    }
}
