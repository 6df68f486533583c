use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::notification::Notification,
    state::AppState,
    store::{Page, PageRequest},
};

/// Persists a notification for its user. A failed write is logged and
/// swallowed: the ledger change it describes has already been committed.
pub async fn notify(state: &AppState, notification: Notification) {
    match state.store.insert_notification(&notification).await {
        Ok(()) => info!(
            user_id = %notification.user_id,
            kind = ?notification.kind,
            "notification sent"
        ),
        Err(e) => warn!(
            user_id = %notification.user_id,
            error = %e,
            "failed to store notification"
        ),
    }
}

pub async fn list_notifications(
    state: &AppState,
    user_id: Uuid,
    unread_only: bool,
    page: PageRequest,
) -> Result<Page<Notification>, AppError> {
    state
        .store
        .list_notifications(user_id, unread_only, page)
        .await
}

pub async fn mark_read(state: &AppState, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
    if state.store.mark_notification_read(user_id, id).await? {
        Ok(())
    } else {
        Err(AppError::NotificationNotFound)
    }
}
