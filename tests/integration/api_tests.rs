//! API integration tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; mail is
//! captured instead of delivered.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use shelfmark_server::{
    api,
    clock::ManualClock,
    config::AppConfig,
    error::AppResult,
    repository::Repository,
    services::{email::Mailer, Services},
    AppState,
};

#[derive(Clone, Debug)]
struct SentMail {
    to: String,
    subject: String,
    text: String,
    html: String,
}

/// Mailer that records every message
#[derive(Default)]
struct CapturingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl CapturingMailer {
    fn last(&self) -> Option<SentMail> {
        self.sent.lock().unwrap().last().cloned()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, to: &str, subject: &str, text_body: &str, html_body: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text_body.to_string(),
            html: html_body.to_string(),
        });
        Ok(())
    }
}

struct TestApp {
    router: Router,
    mailer: Arc<CapturingMailer>,
    clock: Arc<ManualClock>,
}

fn test_app() -> TestApp {
    let mut config = AppConfig::default();
    config.email.app_url = "https://portal.example.org".to_string();
    config.email.app_name = "Shelfmark".to_string();

    let mailer = Arc::new(CapturingMailer::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
    ));

    let services = Services::with_parts(
        Repository::in_memory(),
        &config,
        mailer.clone(),
        clock.clone(),
    );

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    TestApp {
        router: api::router(state),
        mailer,
        clock,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(router, request).await
}

/// Pull the token out of the link in the captured email
fn token_from(mail: &SentMail) -> String {
    let start = mail.html.find("token=").expect("link in email") + "token=".len();
    mail.html[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(&app.router, "/api/v1/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["active_tokens"], 0);
}

#[tokio::test]
async fn test_issue_rejects_malformed_email() {
    let app = test_app();

    let (status, body) = post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "not-an-email" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidIdentifier");
    assert_eq!(body["code"], 3);
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_issue_rejects_out_of_range_ttl() {
    let app = test_app();

    let (status, body) = post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "reader@example.org", "ttl_hours": 4294967295u32 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
    assert_eq!(app.mailer.count(), 0);

    let (_, body) = get(&app.router, "/api/v1/verification/stats").await;
    assert_eq!(body["issued"], 0);
}

#[tokio::test]
async fn test_verification_flow() {
    let app = test_app();

    let (status, body) = post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "reader@example.org", "name": "Ada" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("token").is_none());

    let mail = app.mailer.last().expect("verification email sent");
    assert_eq!(mail.to, "reader@example.org");
    assert_eq!(mail.subject, "Verify Your Email Address - Shelfmark");
    assert!(mail
        .html
        .contains("https://portal.example.org/verify-email?token="));
    let token = token_from(&mail);
    assert_eq!(token.len(), 64);

    let (_, body) = get(&app.router, "/api/v1/verification/status?email=reader@example.org").await;
    assert_eq!(body["verified"], false);

    let uri = format!("/api/v1/verify-email?token={}", token);
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "reader@example.org");

    let (_, body) = get(&app.router, "/api/v1/verification/status?email=reader@example.org").await;
    assert_eq!(body["verified"], true);

    // Single use
    let (status, body) = get(&app.router, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired verification link");
}

#[tokio::test]
async fn test_expired_link_is_rejected() {
    let app = test_app();

    post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "late@example.org", "ttl_hours": 1 }),
    )
    .await;
    let mail = app.mailer.last().unwrap();
    assert!(mail.html.contains("expire in 1 hour."));
    assert!(mail.text.contains("expire in 1 hour."));
    let token = token_from(&mail);

    app.clock.advance(Duration::hours(2));

    let (status, _) = get(&app.router, &format!("/api/v1/verify-email?token={}", token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app.router, "/api/v1/verification/status?email=late@example.org").await;
    assert_eq!(body["verified"], false);
}

#[tokio::test]
async fn test_stats_and_cleanup() {
    let app = test_app();

    post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "a@example.org", "ttl_hours": 1 }),
    )
    .await;
    post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "b@example.org", "ttl_hours": 48 }),
    )
    .await;

    app.clock.advance(Duration::hours(2));

    let (status, body) = get(&app.router, "/api/v1/verification/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["expired"], 1);
    assert_eq!(body["active"], 1);

    let (status, body) = post(&app.router, "/api/v1/verification/cleanup", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = get(&app.router, "/api/v1/verification/stats").await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["expired"], 0);
    assert_eq!(body["issued"], 2);
}

#[tokio::test]
async fn test_resend_issues_a_fresh_link() {
    let app = test_app();

    post(
        &app.router,
        "/api/v1/verification/issue",
        json!({ "email": "again@example.org" }),
    )
    .await;
    let first = token_from(&app.mailer.last().unwrap());

    let (status, body) = post(
        &app.router,
        "/api/v1/verification/resend",
        json!({ "email": "again@example.org" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(app.mailer.count(), 2);

    let second = token_from(&app.mailer.last().unwrap());
    assert_ne!(first, second);

    let (status, _) = get(&app.router, &format!("/api/v1/verify-email?token={}", second)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_email_config_reports_missing_settings() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/v1/email/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    assert!(body["missing_settings"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s == "smtp_host"));

    let (_, body) = post(&app.router, "/api/v1/email/test", json!({ "email": "nope" })).await;
    assert_eq!(body["success"], false);
    assert_eq!(app.mailer.count(), 0);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = test_app();

    let (status, body) = post(&app.router, "/api/v1/sessions", json!({ "login": "ada" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["phase"], "active");
    let id = body["id"].as_str().unwrap().to_string();

    let (status, body) = get(&app.router, &format!("/api/v1/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["login"], "ada");

    let (status, body) = post(&app.router, &format!("/api/v1/sessions/{}/activity", id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "active");

    let (status, body) = post(&app.router, &format!("/api/v1/sessions/{}/extend", id), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "active");

    let (status, _) = post(&app.router, &format!("/api/v1/sessions/{}/logout", id), json!({})).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app.router, &format!("/api/v1/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_requires_login() {
    let app = test_app();

    let (status, _) = post(&app.router, "/api/v1/sessions", json!({ "login": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_settings() {
    let app = test_app();

    let (status, body) = get(&app.router, "/api/v1/settings/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inactivity_timeout_secs"], 900);
    assert_eq!(body["warning_duration_secs"], 60);
}
