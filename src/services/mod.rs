//! Business logic services

pub mod email;
pub mod session;
pub mod sessions;
pub mod timer;
pub mod verification;

use std::sync::Arc;

use crate::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub email: email::EmailService,
    pub verification: verification::VerificationService,
    pub sessions: sessions::SessionsService,
}

impl Services {
    /// Create all services, picking the mailer from the email configuration
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let mailer = email::mailer_from_config(&config.email);
        Self::with_parts(repository, config, mailer, Arc::new(SystemClock))
    }

    /// Create all services with an explicit mailer and clock
    pub fn with_parts(
        repository: Repository,
        config: &AppConfig,
        mailer: Arc<dyn email::Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let email = email::EmailService::new(config.email.clone(), mailer);
        Self {
            verification: verification::VerificationService::new(
                repository.tokens.clone(),
                email.clone(),
                clock,
                config.verification.token_ttl_hours,
            ),
            sessions: sessions::SessionsService::new(config.session.clone()),
            email,
            repository,
        }
    }
}
