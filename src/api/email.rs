//! Email configuration endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::token::EmailTestReport, services::verification::is_plausible_email};

#[derive(Serialize, ToSchema)]
pub struct EmailConfigStatus {
    /// Whether every SMTP setting is present
    pub is_valid: bool,
    pub missing_settings: Vec<String>,
    pub configured_settings: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TestEmailRequest {
    /// Recipient of the sample verification email
    pub email: String,
}

/// Report which SMTP settings are configured
#[utoipa::path(
    get,
    path = "/email/config",
    tag = "email",
    responses(
        (status = 200, description = "Email configuration check", body = EmailConfigStatus)
    )
)]
pub async fn config_status(State(state): State<crate::AppState>) -> Json<EmailConfigStatus> {
    let email = &state.config.email;
    Json(EmailConfigStatus {
        is_valid: email.is_complete(),
        missing_settings: email.missing_settings(),
        configured_settings: email.configured_settings(),
    })
}

/// Send a sample verification email
#[utoipa::path(
    post,
    path = "/email/test",
    tag = "email",
    request_body = TestEmailRequest,
    responses(
        (status = 200, description = "Test outcome", body = EmailTestReport)
    )
)]
pub async fn send_test(
    State(state): State<crate::AppState>,
    Json(request): Json<TestEmailRequest>,
) -> Json<EmailTestReport> {
    let email = request.email.trim();
    if !is_plausible_email(email) {
        let config = &state.config.email;
        return Json(EmailTestReport {
            success: false,
            message: "Invalid email address format".to_string(),
            is_valid: config.is_complete(),
            missing_settings: config.missing_settings(),
            configured_settings: config.configured_settings(),
        });
    }

    let ttl_hours = state.services.verification.default_ttl_hours();
    Json(state.services.email.test_configuration(email, ttl_hours).await)
}
