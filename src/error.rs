use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::{transaction::SettlementError, wallet::LedgerError};

/// Stable machine-readable error codes. Clients branch on these, never on
/// the human message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotAuthorized,
    InvalidToken,
    TokenExpired,
    Forbidden,
    ValidationError,
    AmountBelowMinimum,
    InsufficientPendingEarnings,
    InsufficientBalance,
    WithdrawalNotFound,
    WithdrawalAlreadyProcessed,
    LendingFeeAlreadyCaptured,
    NotificationNotFound,
    InternalError,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not authorized, no token")]
    MissingToken,

    #[error("Not authorized, invalid token")]
    InvalidToken,

    #[error("Not authorized, token expired")]
    TokenExpired,

    #[error("Admin access required")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Minimum withdrawal amount is ₹{0}")]
    AmountBelowMinimum(rust_decimal::Decimal),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Withdrawal request not found")]
    WithdrawalNotFound,

    #[error("Withdrawal request has already been {0}")]
    WithdrawalAlreadyProcessed(&'static str),

    #[error("Lending fee for borrow request {0} has already been captured")]
    LendingFeeAlreadyCaptured(String),

    #[error("Notification not found")]
    NotificationNotFound,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::MissingToken => ErrorCode::NotAuthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::TokenExpired => ErrorCode::TokenExpired,
            AppError::Forbidden => ErrorCode::Forbidden,
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::AmountBelowMinimum(_) => ErrorCode::AmountBelowMinimum,
            AppError::Ledger(LedgerError::NonPositiveAmount | LedgerError::LimitExceeded) => {
                ErrorCode::ValidationError
            }
            AppError::Ledger(LedgerError::InsufficientPendingEarnings { .. }) => {
                ErrorCode::InsufficientPendingEarnings
            }
            AppError::Ledger(LedgerError::InsufficientBalance { .. }) => {
                ErrorCode::InsufficientBalance
            }
            AppError::WithdrawalNotFound => ErrorCode::WithdrawalNotFound,
            AppError::WithdrawalAlreadyProcessed(_) => ErrorCode::WithdrawalAlreadyProcessed,
            AppError::LendingFeeAlreadyCaptured(_) => ErrorCode::LendingFeeAlreadyCaptured,
            AppError::NotificationNotFound => ErrorCode::NotificationNotFound,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingToken | AppError::InvalidToken | AppError::TokenExpired => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Validation(_) | AppError::AmountBelowMinimum(_) | AppError::Ledger(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::WithdrawalNotFound | AppError::NotificationNotFound => StatusCode::NOT_FOUND,
            AppError::WithdrawalAlreadyProcessed(_) | AppError::LendingFeeAlreadyCaptured(_) => {
                StatusCode::CONFLICT
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::NotAWithdrawal => AppError::WithdrawalNotFound,
            SettlementError::AlreadyProcessed(status) => {
                AppError::WithdrawalAlreadyProcessed(status.as_str())
            }
            SettlementError::Ledger(err) => AppError::Ledger(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "success": false,
            "message": message,
            "code": self.code(),
        });

        (status, Json(body)).into_response()
    }
}
