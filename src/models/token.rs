//! Verification token model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single-use, time-bounded proof of control over an email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken {
    pub token: String,
    /// Email address being verified
    pub identifier: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Snapshot of the token store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenStats {
    /// Entries currently held
    pub total: usize,
    /// Held entries past their expiry
    pub expired: usize,
    /// Held entries still redeemable
    pub active: usize,
    /// Tokens ever accepted by the store
    pub issued: u64,
}

/// Outcome of an email delivery request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryReport {
    pub success: bool,
    pub message: String,
}

impl DeliveryReport {
    pub fn sent(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Outcome of an email configuration test
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EmailTestReport {
    pub success: bool,
    pub message: String,
    /// Whether every SMTP setting is present
    pub is_valid: bool,
    pub missing_settings: Vec<String>,
    pub configured_settings: Vec<String>,
}
