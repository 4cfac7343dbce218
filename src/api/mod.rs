//! API handlers for Shelfmark REST endpoints

pub mod email;
pub mod health;
pub mod openapi;
pub mod sessions;
pub mod verification;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Email verification
        .route("/verification/issue", post(verification::issue))
        .route("/verification/resend", post(verification::resend))
        .route("/verification/status", get(verification::status))
        .route("/verification/stats", get(verification::stats))
        .route("/verification/cleanup", post(verification::cleanup))
        .route("/verify-email", get(verification::verify_email))
        // Email configuration
        .route("/email/config", get(email::config_status))
        .route("/email/test", post(email::send_test))
        // Sessions
        .route("/sessions", post(sessions::create_session))
        .route("/sessions/:id", get(sessions::get_session))
        .route("/sessions/:id/activity", post(sessions::record_activity))
        .route("/sessions/:id/extend", post(sessions::extend_session))
        .route("/sessions/:id/logout", post(sessions::logout))
        .route("/settings/session", get(sessions::session_settings))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
