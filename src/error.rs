//! Error types for Shelfmark server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    BadValue = 2,
    InvalidIdentifier = 3,
    InvalidToken = 4,
    DuplicateToken = 5,
    NoSuchSession = 7,
}

/// Token store failures. `NotFound` and `Expired` stay distinct here and are
/// only merged at the service boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token not found")]
    NotFound,

    #[error("token expired")]
    Expired,

    #[error("token already exists")]
    Duplicate,

    #[error("token store failure: {0}")]
    Backend(String),
}

/// Verification workflow failures as seen by callers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Invalid email address: {0}")]
    InvalidIdentifier(String),

    #[error("Token lifetime of {0} hours is out of range")]
    InvalidTtl(u32),

    #[error("Token collision persisted after regeneration")]
    DuplicateToken,

    #[error("Invalid or expired verification link")]
    Invalid,

    #[error("Token store failure: {0}")]
    Store(String),
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchSession, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::Verification(e) => match e {
                VerificationError::InvalidIdentifier(_) => {
                    (StatusCode::BAD_REQUEST, ErrorCode::InvalidIdentifier, e.to_string())
                }
                VerificationError::InvalidTtl(_) => {
                    (StatusCode::BAD_REQUEST, ErrorCode::BadValue, e.to_string())
                }
                VerificationError::Invalid => {
                    (StatusCode::BAD_REQUEST, ErrorCode::InvalidToken, e.to_string())
                }
                VerificationError::DuplicateToken => {
                    tracing::error!("Token collision after retry, entropy source suspect");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::DuplicateToken,
                        "Internal server error".to_string(),
                    )
                }
                VerificationError::Store(msg) => {
                    tracing::error!("Token store error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorCode::Failure,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
