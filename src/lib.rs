//! Shelfmark verification and session server
//!
//! Issues and redeems single-use email verification tokens and tracks login
//! sessions through an inactivity warning protocol, exposed as a REST JSON
//! API for the library portal.

use std::sync::Arc;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
