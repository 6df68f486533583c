use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    models::auth::AuthPayload,
    services::wallet_service::{self, WithdrawalDto},
    state::AppState,
    store::{PageRequest, WithdrawalSubmission},
};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> PageRequest {
        PageRequest::new(self.limit, self.offset)
    }
}

// GET /api/wallet
#[debug_handler]
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthPayload>,
) -> Result<Json<Value>, AppError> {
    let wallet = wallet_service::get_summary(&state, user.user_id).await?;
    Ok(Json(json!({ "success": true, "wallet": wallet })))
}

// GET /api/wallet/transactions?limit=&offset=
#[debug_handler]
pub async fn get_transactions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthPayload>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let page = wallet_service::list_transactions(&state, user.user_id, query.page()).await?;
    Ok(Json(json!({
        "success": true,
        "transactions": page.items,
        "pagination": { "total": page.total, "limit": page.limit, "offset": page.offset },
    })))
}

// GET /api/wallet/withdrawals
#[debug_handler]
pub async fn get_withdrawals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthPayload>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let page = wallet_service::list_withdrawals(&state, user.user_id, query.page()).await?;
    Ok(Json(json!({
        "success": true,
        "withdrawals": page.items,
        "pagination": { "total": page.total, "limit": page.limit, "offset": page.offset },
    })))
}

// POST /api/wallet/withdraw
#[debug_handler]
pub async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(user): Extension<AuthPayload>,
    headers: HeaderMap,
    payload: Result<Json<WithdrawalDto>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;

    let idempotency_key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string);

    let submission =
        wallet_service::request_withdrawal(&state, user.user_id, payload, idempotency_key).await?;

    let response = match submission {
        WithdrawalSubmission::Created(withdrawal) => (
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Withdrawal request submitted successfully",
                "withdrawal": withdrawal,
            })),
        ),
        WithdrawalSubmission::Existing(withdrawal) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Withdrawal request already submitted",
                "withdrawal": withdrawal,
            })),
        ),
    };
    Ok(response)
}
