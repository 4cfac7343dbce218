//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{email, health, sessions, verification};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelfmark API",
        version = "0.3.0",
        description = "Email verification and session lifecycle API for the library portal",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Verification
        verification::issue,
        verification::resend,
        verification::verify_email,
        verification::status,
        verification::stats,
        verification::cleanup,
        // Email
        email::config_status,
        email::send_test,
        // Sessions
        sessions::create_session,
        sessions::get_session,
        sessions::record_activity,
        sessions::extend_session,
        sessions::logout,
        sessions::session_settings,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Verification
            verification::IssueRequest,
            verification::ResendRequest,
            verification::VerifyResponse,
            verification::StatusResponse,
            verification::CleanupResponse,
            crate::models::token::DeliveryReport,
            crate::models::token::TokenStats,
            // Email
            email::EmailConfigStatus,
            email::TestEmailRequest,
            crate::models::token::EmailTestReport,
            // Sessions
            sessions::CreateSessionRequest,
            crate::models::session::SessionInfo,
            crate::models::session::SessionSnapshot,
            crate::models::session::SessionPhase,
            crate::models::session::ExpireReason,
            crate::config::SessionConfig,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "verification", description = "Email verification tokens"),
        (name = "email", description = "Email delivery configuration"),
        (name = "sessions", description = "Session inactivity tracking")
    )
)]
pub struct ApiDoc;

/// Create router for OpenAPI documentation
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
