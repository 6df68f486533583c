use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        auth::AuthPayload,
        transaction::{TransactionSource, WithdrawalAction, WithdrawalStatus},
    },
    services::admin_service::{self, AdjustmentDto, LendingFeeDto, ProcessWithdrawalDto},
    state::AppState,
    store::{PageRequest, TransactionFilter},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequestsQuery {
    /// `pending` (default), `approved`, `rejected` or `all`.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub user_id: Option<Uuid>,
    pub source: Option<TransactionSource>,
    pub status: Option<WithdrawalStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WalletsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/wallet/admin/platform-summary
#[debug_handler]
pub async fn get_platform_summary(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let summary = admin_service::platform_summary(&state).await?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}

// GET /api/wallet/admin/withdrawal-requests?status=
#[debug_handler]
pub async fn get_withdrawal_requests(
    State(state): State<AppState>,
    query: Result<Query<WithdrawalRequestsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;

    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => Some(WithdrawalStatus::Pending),
        Some("all") => None,
        Some(other) => Some(other.parse::<WithdrawalStatus>().map_err(AppError::Validation)?),
    };

    let page = admin_service::list_withdrawal_requests(
        &state,
        status,
        PageRequest::new(query.limit, query.offset),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "withdrawalRequests": page.items,
        "pagination": { "total": page.total, "limit": page.limit, "offset": page.offset },
    })))
}

// PUT /api/wallet/admin/withdrawal-requests/:id
#[debug_handler]
pub async fn process_withdrawal_request(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthPayload>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ProcessWithdrawalDto>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    // A malformed id cannot name any request.
    let Path(request_id) = id.map_err(|_| AppError::WithdrawalNotFound)?;
    let Json(payload) = payload?;
    let action = payload.action;

    let (request, wallet) =
        admin_service::process_withdrawal(&state, admin.user_id, request_id, payload).await?;

    let message = match action {
        WithdrawalAction::Approve => "Withdrawal request approved successfully",
        WithdrawalAction::Reject => "Withdrawal request rejected successfully",
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "withdrawal": request,
        "wallet": wallet,
    })))
}

// GET /api/wallet/admin/transactions
#[debug_handler]
pub async fn get_all_transactions(
    State(state): State<AppState>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;

    let filter = TransactionFilter {
        user_id: query.user_id,
        source: query.source,
        status: query.status,
    };
    let page = admin_service::list_transactions(
        &state,
        filter,
        PageRequest::new(query.limit, query.offset),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "transactions": page.items,
        "pagination": { "total": page.total, "limit": page.limit, "offset": page.offset },
    })))
}

// GET /api/wallet/admin/wallets
#[debug_handler]
pub async fn get_wallets(
    State(state): State<AppState>,
    query: Result<Query<WalletsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let page =
        admin_service::list_wallets(&state, PageRequest::new(query.limit, query.offset)).await?;

    Ok(Json(json!({
        "success": true,
        "wallets": page.items,
        "pagination": { "total": page.total, "limit": page.limit, "offset": page.offset },
    })))
}

// POST /api/wallet/admin/adjust
#[debug_handler]
pub async fn adjust_wallet(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthPayload>,
    payload: Result<Json<AdjustmentDto>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    let (wallet, transaction) = admin_service::adjust_balance(&state, admin.user_id, payload).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Wallet adjusted successfully",
        "wallet": wallet,
        "transaction": transaction,
    })))
}

// POST /api/wallet/admin/lending-fees
#[debug_handler]
pub async fn capture_lending_fee(
    State(state): State<AppState>,
    payload: Result<Json<LendingFeeDto>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let capture = admin_service::capture_lending_fee(&state, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "capture": capture })),
    ))
}
