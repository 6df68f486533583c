use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError, models::auth::AuthPayload, services::notification_service, state::AppState,
    store::PageRequest,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// GET /api/notifications
#[debug_handler]
pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthPayload>,
    query: Result<Query<NotificationsQuery>, QueryRejection>,
) -> Result<Json<Value>, AppError> {
    let Query(query) = query?;
    let page = notification_service::list_notifications(
        &state,
        user.user_id,
        query.unread_only,
        PageRequest::new(query.limit, query.offset),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "notifications": page.items,
        "pagination": { "total": page.total, "limit": page.limit, "offset": page.offset },
    })))
}

// PUT /api/notifications/:id/read
#[debug_handler]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthPayload>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id.map_err(|_| AppError::NotificationNotFound)?;
    notification_service::mark_read(&state, user.user_id, id).await?;
    Ok(Json(json!({ "success": true })))
}
