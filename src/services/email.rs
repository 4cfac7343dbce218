//! Email delivery for verification links

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
    models::token::EmailTestReport,
};

/// Outbound mail collaborator. Delivery success is never assumed by callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> AppResult<()>;
}

/// SMTP delivery through lettre
#[derive(Clone)]
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> AppResult<Message> {
        let from_address = self
            .config
            .smtp_from
            .as_deref()
            .ok_or_else(|| AppError::Internal("Sender address is not configured".to_string()))?;
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or(&self.config.app_name);
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, from_address))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn transport(&self) -> AppResult<SmtpTransport> {
        let host = self
            .config
            .smtp_host
            .as_deref()
            .ok_or_else(|| AppError::Internal("SMTP host is not configured".to_string()))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> AppResult<()> {
        let email = self.build_message(to, subject, text_body, html_body)?;
        let mailer = self.transport()?;

        // lettre's SMTP transport is blocking
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::info!(to, subject, "Email sent");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured: logs the message and reports success
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> AppResult<()> {
        tracing::info!(
            to,
            subject,
            text_len = text_body.len(),
            html_len = html_body.len(),
            "SMTP not configured, email delivery simulated"
        );
        Ok(())
    }
}

/// Pick SMTP when the settings are complete, the logging mailer otherwise
pub fn mailer_from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    if config.is_complete() {
        Arc::new(SmtpMailer::new(config.clone()))
    } else {
        tracing::warn!(
            missing = ?config.missing_settings(),
            "Email configuration incomplete, falling back to simulated delivery"
        );
        Arc::new(LogMailer)
    }
}

/// Renders and sends the verification email
#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
    mailer: Arc<dyn Mailer>,
}

impl EmailService {
    pub fn new(config: EmailConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self { config, mailer }
    }

    /// `{app_url}/verify-email?token={token}`
    pub fn verification_link(&self, token: &str) -> String {
        format!(
            "{}/verify-email?token={}",
            self.config.app_url.trim_end_matches('/'),
            token
        )
    }

    pub fn verification_subject(&self) -> String {
        format!("Verify Your Email Address - {}", self.config.app_name)
    }

    /// Send the verification email for `token`
    pub async fn send_verification_email(
        &self,
        to: &str,
        recipient_name: &str,
        token: &str,
        ttl_hours: u32,
    ) -> AppResult<()> {
        let link = self.verification_link(token);
        tracing::debug!(to, link = %truncate_link(&link), "Sending verification email");

        let text = verification_email_text(&self.config.app_name, recipient_name, &link, ttl_hours);
        let html = verification_email_html(&self.config.app_name, recipient_name, &link, ttl_hours);
        self.mailer
            .send(to, &self.verification_subject(), &text, &html)
            .await
    }

    /// Send a sample verification email and report it together with the
    /// configuration check. Delivery is simulated when SMTP is incomplete.
    pub async fn test_configuration(&self, to: &str, ttl_hours: u32) -> EmailTestReport {
        let missing_settings = self.config.missing_settings();
        let configured_settings = self.config.configured_settings();
        let is_valid = missing_settings.is_empty();

        let (success, message) = match self
            .send_verification_email(to, "Test User", "test-token-123", ttl_hours)
            .await
        {
            Ok(()) if is_valid => (true, "Test email sent successfully! Check your inbox.".to_string()),
            Ok(()) => (
                true,
                "Test email simulated successfully! (No SMTP configuration found)".to_string(),
            ),
            Err(e) => {
                tracing::warn!(to, error = %e, "Test email failed");
                (false, format!("Failed to send test email: {}", e))
            }
        };

        EmailTestReport {
            success,
            message,
            is_valid,
            missing_settings,
            configured_settings,
        }
    }
}

/// Keep the token out of logs beyond its first characters
fn truncate_link(link: &str) -> String {
    match link.find("token=") {
        Some(pos) => {
            let start = pos + "token=".len();
            let end = (start + 8).min(link.len());
            format!("{}...", &link[..end])
        }
        None => link.to_string(),
    }
}

fn verification_email_html(app_name: &str, recipient_name: &str, link: &str, ttl_hours: u32) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Verify Your Email Address</title>
</head>
<body style="font-family: sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1>Verify Your Email Address</h1>
  <p>Hello {name},</p>
  <p>Thank you for registering with {app}! To complete your registration, please verify your email address by following the link below.</p>
  <p style="text-align: center;">
    <a href="{link}" style="background-color: #2563eb; color: white; padding: 14px 28px; text-decoration: none; border-radius: 6px;">Verify Email Address</a>
  </p>
  <p><strong>Button not working?</strong> Copy and paste this link into your browser:</p>
  <p style="word-break: break-all;">{link}</p>
  <p><strong>Security note:</strong> this verification link will expire in {ttl}. If you didn't create an account with us, please ignore this email.</p>
  <p style="color: #6b7280; font-size: 14px;">This email was sent by {app}.</p>
</body>
</html>
"#,
        name = escape_html(recipient_name),
        app = escape_html(app_name),
        link = escape_html(link),
        ttl = expiry_phrase(ttl_hours),
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn verification_email_text(app_name: &str, recipient_name: &str, link: &str, ttl_hours: u32) -> String {
    format!(
        "Hello {name},\n\n\
         Thank you for registering with {app}! To complete your registration, \
         please verify your email address by opening this link:\n\n\
         {link}\n\n\
         This verification link will expire in {ttl}. If you didn't create an \
         account with us, please ignore this email.\n\n\
         -- \n{app}\n",
        name = recipient_name,
        app = app_name,
        link = link,
        ttl = expiry_phrase(ttl_hours),
    )
}

fn expiry_phrase(ttl_hours: u32) -> String {
    match ttl_hours {
        1 => "1 hour".to_string(),
        n => format!("{} hours", n),
    }
}
