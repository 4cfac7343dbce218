//! Session lifecycle types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Session phase. Moves `Active -> Warning -> {Active, Expired}`; `Expired`
/// only leaves through a fresh login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Active,
    Warning,
    Expired,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Active => "active",
            SessionPhase::Warning => "warning",
            SessionPhase::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExpireReason {
    /// Warning countdown ran out (or inactivity with warnings disabled)
    Inactivity,
    /// Explicit logout
    Logout,
    /// Hard session cap reached
    MaxSessionAge,
}

/// Point-in-time view of a session controller
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Milliseconds until the next transition (warning or expiry); zero once
    /// expired, absent when auto logout is disabled
    pub remaining_ms: Option<u64>,
    /// Milliseconds since the last observed activity
    pub idle_ms: u64,
    /// Milliseconds since login
    pub age_ms: u64,
}

/// Session as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub id: Uuid,
    pub login: String,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}
