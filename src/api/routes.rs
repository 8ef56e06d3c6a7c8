//! API Routes
//!
//! HTTP endpoint definitions. Every route here sits behind the auth
//! middleware, which places the caller's `OperationContext` in the request
//! extensions.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthorizationGate;
use crate::domain::{OperationContext, TransactionRecord, TransferPhase, Wallet};
use crate::error::AppError;
use crate::handlers::{
    CreateWalletHandler, LockReconciliationHandler, QueryHandler, TopUpCommand, TopUpHandler,
    TransferCommand, TransferHandler,
};
use crate::store::LedgerStore;

// =========================================================================
// Shared state
// =========================================================================

/// State shared by every request
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub gate: AuthorizationGate,
    /// Attempts to claim a fresh account number
    pub max_create_attempts: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, gate: AuthorizationGate) -> Self {
        Self {
            store,
            gate,
            max_create_attempts: crate::handlers::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_create_attempts(mut self, attempts: u32) -> Self {
        self.max_create_attempts = attempts;
        self
    }
}

// =========================================================================
// Request/Response types
// =========================================================================

/// Success envelope: `{ "ok": true, ...payload }`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self { ok: true, data })
    }
}

/// Amount accepted either as JSON text or as a JSON integer
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Text(String),
    Number(i64),
}

impl AmountField {
    fn into_text(self) -> String {
        match self {
            AmountField::Text(text) => text,
            AmountField::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateWalletResponse {
    pub account_no: String,
    pub owner_iin: String,
}

#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    /// Owner to read; only admins may name someone other than themselves
    #[serde(default)]
    pub iin: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletListResponse {
    pub accounts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub account_no: String,
    pub owner_iin: String,
    pub balance: i64,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        Self {
            locked: wallet.transfer_lock.is_locked(),
            account_no: wallet.account_no,
            owner_iin: wallet.owner_iin,
            balance: wallet.balance,
            locked_at: wallet.locked_at,
            created_at: wallet.created_at,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WalletInfoResponse {
    pub wallets: Vec<WalletResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TopUpRequest {
    pub account: Option<String>,
    pub amount: Option<AmountField>,
}

#[derive(Debug, Serialize)]
pub struct TopUpResponse {
    pub account_no: String,
    pub balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<AmountField>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub status: TransferPhase,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransactionEntry {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub from: String,
    pub to: String,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionEntry {
    fn from(record: TransactionRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind.as_str().to_string(),
            from: record.from_account,
            to: record.to_account,
            amount: record.amount,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub account_no: String,
    pub transactions: Vec<TransactionEntry>,
}

#[derive(Debug, Serialize)]
pub struct LockedWalletsResponse {
    pub locked: Vec<WalletResponse>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseLockResponse {
    pub account_no: String,
    pub released: bool,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Wallets
        .route("/wallets", post(create_wallet).get(list_wallets))
        .route("/wallets/info", get(wallet_info))
        // Balance mutations
        .route("/topup", post(top_up))
        .route("/transfer", post(transfer))
        // History
        .route("/transactions", get(get_transactions))
        // Lock reconciliation (admin)
        .route("/admin/locks", get(list_locks))
        .route("/admin/locks/:account/release", post(release_lock))
}

fn required(value: Option<String>, name: &'static str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(AppError::MissingParameter(name))
}

// =========================================================================
// POST /wallets
// =========================================================================

/// Create a wallet owned by the caller
async fn create_wallet(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<(StatusCode, Json<ApiResponse<CreateWalletResponse>>), AppError> {
    let handler =
        CreateWalletHandler::new(state.store.clone()).with_max_attempts(state.max_create_attempts);

    let result = handler.execute(&context).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::new(CreateWalletResponse {
            account_no: result.account_no,
            owner_iin: result.owner_iin,
        }),
    ))
}

// =========================================================================
// GET /wallets
// =========================================================================

/// Account numbers of the caller (or of `iin` for admins)
async fn list_wallets(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<WalletListResponse>>, AppError> {
    let handler = QueryHandler::new(state.store.clone());
    let accounts = handler
        .get_wallet_list(&context, query.iin.as_deref())
        .await?;

    Ok(ApiResponse::new(WalletListResponse { accounts }))
}

// =========================================================================
// GET /wallets/info
// =========================================================================

/// Full wallet rows including balances
async fn wallet_info(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<ApiResponse<WalletInfoResponse>>, AppError> {
    let handler = QueryHandler::new(state.store.clone());
    let wallets = handler.get_wallets(&context, query.iin.as_deref()).await?;

    Ok(ApiResponse::new(WalletInfoResponse {
        wallets: wallets.into_iter().map(WalletResponse::from).collect(),
    }))
}

// =========================================================================
// POST /topup
// =========================================================================

async fn top_up(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TopUpRequest>,
) -> Result<Json<ApiResponse<TopUpResponse>>, AppError> {
    let account = required(request.account, "account")?;
    let amount = request
        .amount
        .map(AmountField::into_text)
        .ok_or(AppError::MissingParameter("amount"))?;

    let handler = TopUpHandler::new(state.store.clone());
    let result = handler
        .execute(TopUpCommand::new(account, amount), &context)
        .await?;

    Ok(ApiResponse::new(TopUpResponse {
        account_no: result.account_no,
        balance: result.balance,
    }))
}

// =========================================================================
// POST /transfer
// =========================================================================

async fn transfer(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<ApiResponse<TransferResponse>>, AppError> {
    let from = required(request.from, "from")?;
    let to = required(request.to, "to")?;
    let amount = request
        .amount
        .map(AmountField::into_text)
        .ok_or(AppError::MissingParameter("amount"))?;

    let handler = TransferHandler::new(state.store.clone());
    let result = handler
        .execute(TransferCommand::new(from, to, amount), &context)
        .await?;

    Ok(ApiResponse::new(TransferResponse {
        from: result.from,
        to: result.to,
        amount: result.amount,
        status: result.phase,
    }))
}

// =========================================================================
// GET /transactions?account=
// =========================================================================

async fn get_transactions(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<ApiResponse<TransactionsResponse>>, AppError> {
    let account = required(query.account, "account")?;

    let handler = QueryHandler::new(state.store.clone());
    let records = handler.get_transactions(&context, &account).await?;

    Ok(ApiResponse::new(TransactionsResponse {
        account_no: account,
        transactions: records.into_iter().map(TransactionEntry::from).collect(),
    }))
}

// =========================================================================
// GET /admin/locks
// =========================================================================

async fn list_locks(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
) -> Result<Json<ApiResponse<LockedWalletsResponse>>, AppError> {
    let handler = LockReconciliationHandler::new(state.store.clone());
    let locked = handler.locked_accounts(&context).await?;

    Ok(ApiResponse::new(LockedWalletsResponse {
        locked: locked.into_iter().map(WalletResponse::from).collect(),
    }))
}

// =========================================================================
// POST /admin/locks/:account/release
// =========================================================================

async fn release_lock(
    State(state): State<AppState>,
    Extension(context): Extension<OperationContext>,
    Path(account): Path<String>,
) -> Result<Json<ApiResponse<ReleaseLockResponse>>, AppError> {
    let handler = LockReconciliationHandler::new(state.store.clone());
    handler.release(&context, &account).await?;

    Ok(ApiResponse::new(ReleaseLockResponse {
        account_no: account,
        released: true,
    }))
}
