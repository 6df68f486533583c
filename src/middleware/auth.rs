use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    error::AppError, models::auth::AuthPayload, state::AppState, utils::auth_token::decode_token,
};

/// Requires a valid Bearer token and injects the caller's [`AuthPayload`].
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AppError::MissingToken)?;

    let claims = decode_token(&state.config.jwt_secret, token)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    req.extensions_mut().insert(AuthPayload {
        user_id,
        email: claims.email,
        role: claims.role,
    });
    Ok(next.run(req).await)
}

/// Must run inside `protect`.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let is_admin = req
        .extensions()
        .get::<AuthPayload>()
        .is_some_and(AuthPayload::is_admin);

    if !is_admin {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}
