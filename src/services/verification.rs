//! Email verification workflow: issue, deliver, redeem

use chrono::Duration;
use once_cell::sync::Lazy;
use rand::RngCore;
use regex::Regex;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::{
    clock::Clock,
    error::{TokenError, VerificationError},
    models::token::{DeliveryReport, TokenStats, VerificationToken},
    repository::TokenStore,
    services::email::EmailService,
};

/// Advisory format check: something@something.something, no whitespace
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("valid email regex"));

/// Bytes of randomness per token (hex-encoded to twice that length)
const TOKEN_BYTES: usize = 32;

/// Anything shorter is rejected before the store is consulted
const MIN_TOKEN_LEN: usize = 10;

pub fn is_plausible_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// First characters of a token, for logs
fn token_prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

impl From<TokenError> for VerificationError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::NotFound | TokenError::Expired => VerificationError::Invalid,
            TokenError::Duplicate => VerificationError::DuplicateToken,
            TokenError::Backend(msg) => VerificationError::Store(msg),
        }
    }
}

#[derive(Clone)]
pub struct VerificationService {
    tokens: Arc<dyn TokenStore>,
    email: EmailService,
    clock: Arc<dyn Clock>,
    default_ttl_hours: u32,
}

impl VerificationService {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        email: EmailService,
        clock: Arc<dyn Clock>,
        default_ttl_hours: u32,
    ) -> Self {
        Self {
            tokens,
            email,
            clock,
            default_ttl_hours,
        }
    }

    pub fn default_ttl_hours(&self) -> u32 {
        self.default_ttl_hours
    }

    /// Issue a fresh token for `identifier`, valid for `ttl_hours`
    pub async fn issue(&self, identifier: &str, ttl_hours: u32) -> Result<String, VerificationError> {
        let identifier = identifier.trim();
        if !is_plausible_email(identifier) {
            tracing::debug!(identifier, "Rejected token request for malformed address");
            return Err(VerificationError::InvalidIdentifier(identifier.to_string()));
        }

        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(Duration::hours(i64::from(ttl_hours)))
            .ok_or_else(|| {
                tracing::debug!(identifier, ttl_hours, "Rejected token request with out-of-range lifetime");
                VerificationError::InvalidTtl(ttl_hours)
            })?;

        // One regeneration on collision; a second one means the entropy source is broken
        let mut retried = false;
        loop {
            let token = generate_token();
            let record = VerificationToken {
                token: token.clone(),
                identifier: identifier.to_string(),
                expires_at,
                created_at,
            };
            match self.tokens.put(record).await {
                Ok(()) => {
                    tracing::info!(
                        identifier,
                        token = token_prefix(&token),
                        %expires_at,
                        "Verification token issued"
                    );
                    return Ok(token);
                }
                Err(TokenError::Duplicate) if !retried => {
                    tracing::warn!("Verification token collision, regenerating");
                    retried = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Ask the mailer to deliver the verification link for a token issued
    /// with the default TTL. Failures are reported, never raised, and leave
    /// the token valid.
    pub async fn request_delivery(
        &self,
        identifier: &str,
        token: &str,
        display_name: Option<&str>,
    ) -> DeliveryReport {
        self.request_delivery_for(identifier, token, display_name, self.default_ttl_hours)
            .await
    }

    /// Same as [`request_delivery`](Self::request_delivery) for a token issued
    /// with `ttl_hours`; the email states that lifetime.
    pub async fn request_delivery_for(
        &self,
        identifier: &str,
        token: &str,
        display_name: Option<&str>,
        ttl_hours: u32,
    ) -> DeliveryReport {
        let identifier = identifier.trim();
        if identifier.is_empty() || token.is_empty() {
            let report = DeliveryReport::failed("Missing email or token for verification email");
            tracing::warn!(message = %report.message, "Verification email not sent");
            return report;
        }
        if !is_plausible_email(identifier) {
            tracing::warn!(identifier, "Verification email not sent, invalid email format");
            return DeliveryReport::failed("Invalid email format");
        }

        let recipient_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| identifier.split('@').next().unwrap_or(identifier));

        match self
            .email
            .send_verification_email(identifier, recipient_name, token, ttl_hours)
            .await
        {
            Ok(()) => {
                tracing::info!(identifier, "Verification email sent");
                DeliveryReport::sent("Verification email sent successfully")
            }
            Err(e) => {
                tracing::warn!(identifier, error = %e, "Verification email delivery failed");
                DeliveryReport::failed(format!("Failed to send verification email: {}", e))
            }
        }
    }

    /// Consume a token and return the identity it proves. Unknown and expired
    /// tokens are indistinguishable to the caller.
    pub async fn redeem(&self, token: &str) -> Result<String, VerificationError> {
        let token = token.trim();
        if token.len() < MIN_TOKEN_LEN {
            tracing::debug!("Rejected malformed verification token");
            return Err(VerificationError::Invalid);
        }

        match self.tokens.take_if_valid(token, self.clock.now()).await {
            Ok(identifier) => {
                tracing::info!(identifier = %identifier, token = token_prefix(token), "Verification token redeemed");
                Ok(identifier)
            }
            Err(e) => {
                tracing::info!(token = token_prefix(token), reason = %e, "Verification token rejected");
                Err(e.into())
            }
        }
    }

    /// Issue a new token with the default TTL and deliver it. No delivery is
    /// attempted when issuance fails.
    pub async fn resend(&self, identifier: &str) -> DeliveryReport {
        match self.issue(identifier, self.default_ttl_hours).await {
            Ok(token) => self.request_delivery(identifier, &token, None).await,
            Err(e) => {
                tracing::warn!(identifier, error = %e, "Resend aborted");
                DeliveryReport::failed(format!("Failed to resend verification email: {}", e))
            }
        }
    }

    /// Drop every expired token
    pub async fn sweep_expired(&self) -> Result<usize, VerificationError> {
        let removed = self.tokens.sweep_expired(self.clock.now()).await?;
        tracing::info!(removed, "Expired verification tokens cleaned up");
        Ok(removed)
    }

    pub async fn stats(&self) -> Result<TokenStats, VerificationError> {
        Ok(self.tokens.stats(self.clock.now()).await?)
    }

    /// Run `sweep_expired` every `period` until the task is aborted
    pub fn spawn_sweeper(&self, period: std::time::Duration) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = service.sweep_expired().await {
                    tracing::error!(error = %e, "Token sweep failed");
                }
            }
        })
    }
}
