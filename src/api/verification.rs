//! Email verification endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::token::{DeliveryReport, TokenStats},
    repository::AccountDirectory,
    services::verification::is_plausible_email,
};

/// Request a verification email for a new registration
#[derive(Deserialize, ToSchema)]
pub struct IssueRequest {
    /// Address to verify
    pub email: String,
    /// Name used in the greeting; defaults to the address' local part
    pub name: Option<String>,
    /// Token lifetime in hours; defaults to the configured TTL
    pub ttl_hours: Option<u32>,
}

#[derive(Deserialize, ToSchema)]
pub struct ResendRequest {
    pub email: String,
}

#[derive(Deserialize, IntoParams)]
pub struct VerifyQuery {
    /// Token from the verification link
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub success: bool,
    /// Address that is now verified
    pub email: String,
    pub message: String,
}

#[derive(Deserialize, IntoParams)]
pub struct StatusQuery {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    pub email: String,
    pub verified: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CleanupResponse {
    /// Number of expired tokens removed
    pub removed: usize,
}

/// Issue a verification token and email the link
///
/// A failed delivery is reported in the body; the token stays valid and a
/// resend can be requested.
#[utoipa::path(
    post,
    path = "/verification/issue",
    tag = "verification",
    request_body = IssueRequest,
    responses(
        (status = 200, description = "Token issued, delivery outcome", body = DeliveryReport),
        (status = 400, description = "Malformed email address or token lifetime", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue(
    State(state): State<crate::AppState>,
    Json(request): Json<IssueRequest>,
) -> AppResult<Json<DeliveryReport>> {
    let verification = &state.services.verification;
    let ttl_hours = request.ttl_hours.unwrap_or_else(|| verification.default_ttl_hours());

    let token = verification.issue(&request.email, ttl_hours).await?;
    let report = verification
        .request_delivery_for(&request.email, &token, request.name.as_deref(), ttl_hours)
        .await;

    Ok(Json(report))
}

/// Issue a new token and resend the verification email
#[utoipa::path(
    post,
    path = "/verification/resend",
    tag = "verification",
    request_body = ResendRequest,
    responses(
        (status = 200, description = "Resend outcome", body = DeliveryReport)
    )
)]
pub async fn resend(
    State(state): State<crate::AppState>,
    Json(request): Json<ResendRequest>,
) -> Json<DeliveryReport> {
    Json(state.services.verification.resend(&request.email).await)
}

/// Redeem a verification token and mark its address verified
#[utoipa::path(
    get,
    path = "/verify-email",
    tag = "verification",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Email verified", body = VerifyResponse),
        (status = 400, description = "Invalid or expired verification link", body = crate::error::ErrorResponse)
    )
)]
pub async fn verify_email(
    State(state): State<crate::AppState>,
    Query(query): Query<VerifyQuery>,
) -> AppResult<Json<VerifyResponse>> {
    let email = state.services.verification.redeem(&query.token).await?;
    state.services.repository.accounts.mark_verified(&email).await?;

    Ok(Json(VerifyResponse {
        success: true,
        message: format!("Email {} verified successfully", email),
        email,
    }))
}

/// Check whether an address has been verified
#[utoipa::path(
    get,
    path = "/verification/status",
    tag = "verification",
    params(StatusQuery),
    responses(
        (status = 200, description = "Verification status", body = StatusResponse)
    )
)]
pub async fn status(
    State(state): State<crate::AppState>,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<StatusResponse>> {
    let verified = is_plausible_email(query.email.trim())
        && state.services.repository.accounts.is_verified(&query.email).await?;

    Ok(Json(StatusResponse {
        email: query.email,
        verified,
    }))
}

/// Token store statistics
#[utoipa::path(
    get,
    path = "/verification/stats",
    tag = "verification",
    responses(
        (status = 200, description = "Token statistics", body = TokenStats)
    )
)]
pub async fn stats(State(state): State<crate::AppState>) -> AppResult<Json<TokenStats>> {
    Ok(Json(state.services.verification.stats().await?))
}

/// Remove expired tokens now
#[utoipa::path(
    post,
    path = "/verification/cleanup",
    tag = "verification",
    responses(
        (status = 200, description = "Expired tokens removed", body = CleanupResponse)
    )
)]
pub async fn cleanup(State(state): State<crate::AppState>) -> AppResult<Json<CleanupResponse>> {
    let removed = state.services.verification.sweep_expired().await?;
    Ok(Json(CleanupResponse { removed }))
}
