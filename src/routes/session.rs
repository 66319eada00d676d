use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    middleware::Identity,
    routes::AppState,
    services::{favorites::require_identity, progression::ProgressView},
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    name: String,
}

/// Starts a fresh progression session; any previous progress for the name is reset
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<ProgressView>> {
    let name = require_identity(Some(body.name.as_str()))
        .map_err(|_| AppError::Validation("name is required".to_string()))?;

    Ok(Json(state.sessions.login(name).await))
}

pub async fn logout(State(state): State<AppState>, identity: Identity) -> AppResult<StatusCode> {
    let name = require_identity(identity.as_deref())?;
    state.sessions.logout(name).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn achievements(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<ProgressView>> {
    let name = require_identity(identity.as_deref())?;
    state
        .sessions
        .snapshot(name)
        .await
        .map(Json)
        .ok_or(AppError::AuthRequired)
}

pub async fn dismiss_notification(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<StatusCode> {
    let name = require_identity(identity.as_deref())?;
    if !state.sessions.dismiss_notification(name).await {
        return Err(AppError::AuthRequired);
    }
    Ok(StatusCode::NO_CONTENT)
}
