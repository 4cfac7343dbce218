//! Registry of live sessions, one controller per login

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use uuid::Uuid;

use crate::{
    config::SessionConfig,
    error::{AppError, AppResult},
    models::session::{SessionInfo, SessionPhase},
    services::session::{SessionController, SessionHooks, SessionSettings},
};

struct SessionEntry {
    login: String,
    controller: SessionController,
}

type SessionMap = HashMap<Uuid, SessionEntry>;

#[derive(Clone)]
pub struct SessionsService {
    config: SessionConfig,
    sessions: Arc<Mutex<SessionMap>>,
}

fn lock(sessions: &Mutex<SessionMap>) -> MutexGuard<'_, SessionMap> {
    sessions.lock().unwrap_or_else(|e| e.into_inner())
}

impl SessionsService {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a session for `login`. The entry is dropped from the registry
    /// as soon as the session expires.
    pub fn create(&self, login: &str) -> AppResult<SessionInfo> {
        let login = login.trim();
        if login.is_empty() {
            return Err(AppError::Validation("Login is required".to_string()));
        }

        let id = Uuid::new_v4();
        let registry: Weak<Mutex<SessionMap>> = Arc::downgrade(&self.sessions);
        let warn_login = login.to_string();
        let expire_login = login.to_string();

        let hooks = SessionHooks::new()
            .on_warn(move |countdown| {
                tracing::info!(%id, login = %warn_login, countdown_secs = countdown.as_secs(), "Session timeout warning");
            })
            .on_expire(move |reason| {
                tracing::info!(%id, login = %expire_login, ?reason, "Session ended");
                if let Some(sessions) = registry.upgrade() {
                    lock(&sessions).remove(&id);
                }
            });

        let controller = SessionController::start(SessionSettings::from(&self.config), hooks);
        let info = SessionInfo {
            id,
            login: login.to_string(),
            snapshot: controller.snapshot(),
        };

        lock(&self.sessions).insert(
            id,
            SessionEntry {
                login: login.to_string(),
                controller: controller.clone(),
            },
        );
        // The expire hook may have run before the entry existed
        if controller.phase() == SessionPhase::Expired {
            lock(&self.sessions).remove(&id);
        }
        tracing::info!(%id, login, "Session started");
        Ok(info)
    }

    /// Clone the controller out so that hooks never run under the registry lock
    fn find(&self, id: Uuid) -> AppResult<(String, SessionController)> {
        lock(&self.sessions)
            .get(&id)
            .map(|entry| (entry.login.clone(), entry.controller.clone()))
            .ok_or_else(|| AppError::NotFound("Session expired or not found".to_string()))
    }

    pub fn get(&self, id: Uuid) -> AppResult<SessionInfo> {
        let (login, controller) = self.find(id)?;
        Ok(SessionInfo {
            id,
            login,
            snapshot: controller.snapshot(),
        })
    }

    /// Record activity for the session
    pub fn activity(&self, id: Uuid) -> AppResult<SessionInfo> {
        let (login, controller) = self.find(id)?;
        controller.activity();
        Ok(SessionInfo {
            id,
            login,
            snapshot: controller.snapshot(),
        })
    }

    /// Dismiss the warning and restart the inactivity window
    pub fn extend(&self, id: Uuid) -> AppResult<SessionInfo> {
        let (login, controller) = self.find(id)?;
        if controller.extend() == SessionPhase::Expired {
            return Err(AppError::NotFound("Session expired or not found".to_string()));
        }
        Ok(SessionInfo {
            id,
            login,
            snapshot: controller.snapshot(),
        })
    }

    pub fn logout(&self, id: Uuid) -> AppResult<()> {
        let (_, controller) = self.find(id)?;
        controller.logout_now();
        Ok(())
    }

    pub fn count(&self) -> usize {
        lock(&self.sessions).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> SessionConfig {
        SessionConfig {
            inactivity_timeout_secs: 60,
            warning_duration_secs: 10,
            ..SessionConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_and_get() {
        let service = SessionsService::new(config());
        let info = service.create("reader").unwrap();

        assert_eq!(info.snapshot.phase, SessionPhase::Active);
        assert_eq!(info.snapshot.remaining_ms, Some(60_000));

        let fetched = service.get(info.id).unwrap();
        assert_eq!(fetched.login, "reader");
        assert_eq!(service.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_login_rejected() {
        let service = SessionsService::new(config());
        assert!(matches!(service.create("  "), Err(AppError::Validation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_removed() {
        let service = SessionsService::new(config());
        let info = service.create("reader").unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(service.get(info.id).unwrap().snapshot.phase, SessionPhase::Warning);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(matches!(service.get(info.id), Err(AppError::NotFound(_))));
        assert_eq!(service.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_instantly_expiring_sessions_are_not_kept() {
        let service = SessionsService::new(SessionConfig {
            inactivity_timeout_secs: 0,
            enable_warning: false,
            ..SessionConfig::default()
        });

        for _ in 0..64 {
            service.create("reader").unwrap();
        }

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while service.count() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(service.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend_and_logout() {
        let service = SessionsService::new(config());
        let info = service.create("reader").unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;
        let extended = service.extend(info.id).unwrap();
        assert_eq!(extended.snapshot.phase, SessionPhase::Active);

        service.logout(info.id).unwrap();
        assert!(matches!(service.activity(info.id), Err(AppError::NotFound(_))));
        assert!(matches!(service.logout(info.id), Err(AppError::NotFound(_))));
    }
}
