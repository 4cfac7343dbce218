//! Session lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{config::SessionConfig, error::AppResult, models::session::SessionInfo};

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Login of the user the session belongs to
    pub login: String,
}

/// Start a session after login
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session started", body = SessionInfo),
        (status = 400, description = "Missing login", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> AppResult<(StatusCode, Json<SessionInfo>)> {
    let info = state.services.sessions.create(&request.login)?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// Current phase and time remaining
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session state", body = SessionInfo),
        (status = 404, description = "Session expired or not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_session(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionInfo>> {
    Ok(Json(state.services.sessions.get(id)?))
}

/// Report user activity
#[utoipa::path(
    post,
    path = "/sessions/{id}/activity",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session state after the activity", body = SessionInfo),
        (status = 404, description = "Session expired or not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn record_activity(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionInfo>> {
    Ok(Json(state.services.sessions.activity(id)?))
}

/// Stay logged in: dismiss the timeout warning
#[utoipa::path(
    post,
    path = "/sessions/{id}/extend",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "Session extended", body = SessionInfo),
        (status = 404, description = "Session expired or not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn extend_session(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionInfo>> {
    Ok(Json(state.services.sessions.extend(id)?))
}

/// End the session now
#[utoipa::path(
    post,
    path = "/sessions/{id}/logout",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 204, description = "Logged out"),
        (status = 404, description = "Session expired or not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<crate::AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.sessions.logout(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Effective session timeout settings
#[utoipa::path(
    get,
    path = "/settings/session",
    tag = "sessions",
    responses(
        (status = 200, description = "Session settings", body = SessionConfig)
    )
)]
pub async fn session_settings(State(state): State<crate::AppState>) -> Json<SessionConfig> {
    Json(state.services.sessions.settings().clone())
}
