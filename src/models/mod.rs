//! Data models for Shelfmark

pub mod session;
pub mod token;

// Re-export commonly used types
pub use session::{ExpireReason, SessionInfo, SessionPhase, SessionSnapshot};
pub use token::{DeliveryReport, EmailTestReport, TokenStats, VerificationToken};
