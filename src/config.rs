//! Configuration management for Shelfmark server

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
    pub smtp_from_name: Option<String>,
    pub smtp_use_tls: bool,
    /// Public base URL used to build verification links
    pub app_url: String,
    /// Product name shown in subjects and email bodies
    pub app_name: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VerificationConfig {
    pub token_ttl_hours: u32,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, utoipa::ToSchema)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds without activity before the warning is raised
    pub inactivity_timeout_secs: u64,
    /// Seconds the warning stays up before forced logout
    pub warning_duration_secs: u64,
    /// Hard cap on a session, counted from login
    pub max_session_duration_hours: u64,
    pub enable_warning: bool,
    pub enable_auto_logout: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Environment variables (with prefix SHELFMARK_), e.g. SHELFMARK_EMAIL__SMTP_HOST
            .add_source(
                Environment::with_prefix("SHELFMARK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Conventional variable names win over the prefixed ones
            .set_override_option("email.smtp_host", env::var("SMTP_HOST").ok())?
            .set_override_option("email.smtp_username", env::var("SMTP_USER").ok())?
            .set_override_option("email.smtp_password", env::var("SMTP_PASS").ok())?
            .set_override_option("email.smtp_from", env::var("FROM_EMAIL").ok())?
            .set_override_option("email.app_url", env::var("APP_URL").ok())?
            .build()?;

        config.try_deserialize()
    }
}

impl EmailConfig {
    fn settings(&self) -> [(&'static str, bool); 5] {
        [
            ("smtp_host", self.smtp_host.is_some()),
            ("smtp_port", self.smtp_port != 0),
            ("smtp_username", self.smtp_username.is_some()),
            ("smtp_password", self.smtp_password.is_some()),
            ("smtp_from", self.smtp_from.is_some()),
        ]
    }

    /// Names of the SMTP settings that are not configured
    pub fn missing_settings(&self) -> Vec<String> {
        self.settings()
            .iter()
            .filter(|(_, set)| !set)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Names of the SMTP settings that are configured
    pub fn configured_settings(&self) -> Vec<String> {
        self.settings()
            .iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_settings().is_empty()
    }
}

impl VerificationConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl SessionConfig {
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    pub fn warning_duration(&self) -> Duration {
        Duration::from_secs(self.warning_duration_secs)
    }

    pub fn max_session_duration(&self) -> Duration {
        Duration::from_secs(self.max_session_duration_hours * 3600)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from: None,
            smtp_from_name: Some("Library Management System".to_string()),
            smtp_use_tls: true,
            app_url: "http://localhost:3000".to_string(),
            app_name: "Library Management System".to_string(),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: 24,
            sweep_interval_secs: 3600,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 15 * 60,
            warning_duration_secs: 60,
            max_session_duration_hours: 8,
            enable_warning: true,
            enable_auto_logout: true,
        }
    }
}
