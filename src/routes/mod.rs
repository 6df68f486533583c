use axum::{
    extract::State,
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::{
    controllers::{admin_controller, notification_controller, wallet_controller},
    middleware::auth::{protect, require_admin},
    state::AppState,
};

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(wallet_controller::get_transactions))
        .route("/withdraw", post(wallet_controller::request_withdrawal))
        .route("/withdrawals", get(wallet_controller::get_withdrawals))
        .nest("/admin", admin_routes())
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/platform-summary",
            get(admin_controller::get_platform_summary),
        )
        .route(
            "/withdrawal-requests",
            get(admin_controller::get_withdrawal_requests),
        )
        .route(
            "/withdrawal-requests/:id",
            put(admin_controller::process_withdrawal_request),
        )
        .route("/transactions", get(admin_controller::get_all_transactions))
        .route("/wallets", get(admin_controller::get_wallets))
        .route("/adjust", post(admin_controller::adjust_wallet))
        .route("/lending-fees", post(admin_controller::capture_lending_fee))
        .route_layer(from_fn(require_admin))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notification_controller::get_notifications))
        .route(
            "/:id/read",
            put(notification_controller::mark_notification_read),
        )
}

pub fn app(state: AppState) -> Router {
    // The summary answers with and without the trailing slash.
    let protected_routes = Router::new()
        .route("/api/wallet", get(wallet_controller::get_wallet))
        .route("/api/wallet/", get(wallet_controller::get_wallet))
        .nest("/api/wallet", wallet_routes())
        .nest("/api/notifications", notification_routes())
        .route_layer(from_fn_with_state(state.clone(), protect));

    Router::new()
        .route("/", get(health_check))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// Verifies the store is reachable.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "service": "book-wallet-api" })),
        ),
        Err(e) => {
            error!("Store health check failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error", "service": "book-wallet-api" })),
            )
        }
    }
}
