//! Background Jobs
//!
//! Periodic maintenance over the ledger store. The only job reports soft
//! locks that stay set after a transfer failed to release them; locks are
//! never cleared here, that is an operator decision.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;

use crate::domain::Wallet;
use crate::store::{LedgerStore, StoreError};

// =========================================================================
// Stuck Lock Detection
// =========================================================================

/// Locked wallets whose lock was taken at least `older_than` before `now`.
///
/// A healthy transfer holds its locks for the duration of one store
/// transaction, so anything older is almost certainly stuck. Age is measured
/// from `locked_at`; top-ups still land on a locked wallet and move
/// `updated_at`, so that column says nothing about the lock.
pub async fn find_stuck_locks(
    store: &dyn LedgerStore,
    older_than: chrono::Duration,
    now: DateTime<Utc>,
) -> Result<Vec<Wallet>, JobError> {
    let cutoff = now - older_than;
    let stuck = store
        .locked_accounts()
        .await?
        .into_iter()
        .filter(|wallet| wallet.locked_at.is_some_and(|at| at <= cutoff))
        .collect();
    Ok(stuck)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval between stuck lock scans (default: 1 minute)
    pub stuck_lock_scan_interval: Duration,
    /// Minimum lock age reported as stuck (default: 5 minutes)
    pub stuck_lock_threshold: chrono::Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            stuck_lock_scan_interval: Duration::from_secs(60),
            stuck_lock_threshold: chrono::Duration::minutes(5),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    store: Arc<dyn LedgerStore>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(store: Arc<dyn LedgerStore>, config: JobSchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.stuck_lock_scan_interval.as_secs(),
            "Job scheduler started"
        );

        let mut scan_interval = interval(self.config.stuck_lock_scan_interval);

        loop {
            scan_interval.tick().await;
            self.scan_once(Utc::now()).await;
        }
    }

    /// Run one scan and log what it found (for manual trigger or testing)
    pub async fn scan_once(&self, now: DateTime<Utc>) -> ScanReport {
        let mut report = ScanReport {
            stuck_accounts: Vec::new(),
            error: None,
            completed_at: now,
        };

        match find_stuck_locks(self.store.as_ref(), self.config.stuck_lock_threshold, now).await
        {
            Ok(stuck) => {
                for wallet in &stuck {
                    tracing::error!(
                        alert = true,
                        account = %wallet.account_no,
                        owner = %wallet.owner_iin,
                        locked_since = ?wallet.locked_at,
                        "Transfer lock appears stuck; release it via /admin/locks"
                    );
                }
                report.stuck_accounts = stuck.into_iter().map(|w| w.account_no).collect();
            }
            Err(e) => {
                tracing::error!(error = %e, "Stuck lock scan failed");
                report.error = Some(e.to_string());
            }
        }

        report
    }
}

/// Report from one stuck lock scan
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub stuck_accounts: Vec<String>,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =========================================================================
// Tests
// =========================================================================
