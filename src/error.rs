//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::auth::AuthError;
use crate::domain::WalletError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Auth(#[from] AuthError),

    // Use-case errors
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status and stable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::MissingParameter(_) => (StatusCode::BAD_REQUEST, "missing_parameter"),

            AppError::Auth(e) => match e {
                AuthError::MissingToken => (StatusCode::FORBIDDEN, "missing_token"),
                AuthError::InvalidToken(_) => (StatusCode::FORBIDDEN, "invalid_token"),
                AuthError::TokenExpired => (StatusCode::FORBIDDEN, "token_expired"),
                AuthError::Signing(_) => (StatusCode::INTERNAL_SERVER_ERROR, "token_signing_error"),
            },

            AppError::Wallet(e) => wallet_status(e),
        }
    }
}

/// Double failures are classified by their phase 3 error.
fn wallet_status(err: &WalletError) -> (StatusCode, &'static str) {
    match err.primary() {
        // 400 Bad Request
        WalletError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, "invalid_amount"),
        WalletError::InsufficientFunds { .. } => (StatusCode::BAD_REQUEST, "insufficient_funds"),
        WalletError::SameAccountTransfer => (StatusCode::BAD_REQUEST, "same_account_transfer"),

        // 403 Forbidden
        WalletError::OwnershipMismatch => (StatusCode::FORBIDDEN, "ownership_mismatch"),
        WalletError::AdminRequired => (StatusCode::FORBIDDEN, "admin_required"),

        // 404 Not Found
        WalletError::AccountNotFound(_) => (StatusCode::NOT_FOUND, "account_not_found"),

        // 409 Conflict
        WalletError::LockConflict { .. } => (StatusCode::CONFLICT, "lock_conflict"),
        WalletError::UpdateConflict(_) => (StatusCode::CONFLICT, "update_conflict"),
        WalletError::AccountNumberConflict { .. } => {
            (StatusCode::CONFLICT, "account_number_conflict")
        }

        // 422 Unprocessable Entity
        WalletError::CapacityExceeded(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "capacity_exceeded")
        }

        // 500 Internal Server Error
        WalletError::CorruptAccountNumber(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_account_number")
        }
        WalletError::LockReleaseFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "lock_release_failed")
        }
        WalletError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error"),
        WalletError::ReleaseAfterFailure { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "release_after_failure")
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let alert = matches!(&self, AppError::Wallet(e) if e.requires_alert());
        if alert {
            tracing::error!(alert = true, error = %self, "Transfer left soft locks set");
        } else if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
        }

        // Server-side details stay in the log
        let (error, details) = if status.is_server_error() && !alert {
            ("Internal server error".to_string(), None)
        } else {
            match &self {
                AppError::Wallet(WalletError::ReleaseAfterFailure { release, .. }) => {
                    (self.to_string(), Some(release.to_string()))
                }
                _ => (self.to_string(), None),
            }
        };

        let body = ErrorResponse {
            ok: false,
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
