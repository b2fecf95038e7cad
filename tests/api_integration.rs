//! End-to-end tests over the HTTP surface with an in-memory database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use vasop::app::{self, AppState};
use vasop::auth::AuthService;
use vasop::auth::model::ResetCode;
use vasop::config::{JwtConfig, SpeechConfig};
use vasop::notify::{DispatchResult, Notification, Notifier};
use vasop::onboarding::OnboardingManager;
use vasop::speech::SpeechService;
use vasop::store::{Database, LibSqlBackend};

struct StubNotifier {
    deliver: bool,
    sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn send(&self, notification: &Notification) -> DispatchResult {
        self.sent.lock().unwrap().push(notification.clone());
        if self.deliver {
            DispatchResult::sent(Some("campaign-9".into()))
        } else {
            DispatchResult::failed()
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

struct TestApp {
    router: Router,
    db: Arc<LibSqlBackend>,
    notifier: Arc<StubNotifier>,
}

async fn test_app_with(deliver: bool) -> TestApp {
    let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let notifier = Arc::new(StubNotifier {
        deliver,
        sent: Mutex::new(Vec::new()),
    });
    let jwt = JwtConfig {
        secret: SecretString::from("integration-test-secret"),
        expiry_days: 7,
    };

    let auth = Arc::new(AuthService::new(db.clone(), notifier.clone(), jwt));
    let onboarding = Arc::new(OnboardingManager::new(
        db.clone(),
        notifier.clone(),
        "admin@x.com".into(),
    ));
    let speech = Arc::new(SpeechService::new(SpeechConfig::default()));

    let state = AppState {
        auth,
        onboarding,
        speech,
    };
    TestApp {
        router: app::router(state, "http://localhost:3000"),
        db,
        notifier,
    }
}

async fn test_app() -> TestApp {
    test_app_with(true).await
}

async fn send(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(
    router: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send(router, method, path, token, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signup(router: &Router, email: &str) -> String {
    let (status, body) = send_json(
        router,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "name": "Alice",
            "email": email,
            "password": "secret1",
            "phone": "555-0100",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = send_json(&app.router, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn signup_login_and_profile() {
    let app = test_app().await;
    let token = signup(&app.router, "alice@example.com").await;

    let (status, profile) =
        send_json(&app.router, "GET", "/auth/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "alice@example.com");
    assert_eq!(profile["role"], "business_owner");
    assert!(profile.get("passwordHash").is_none());

    let (status, login) = send_json(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(login["token"].as_str().is_some());
    assert_eq!(login["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn profile_requires_valid_token() {
    let app = test_app().await;
    let (status, _) = send_json(&app.router, "GET", "/auth/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send_json(&app.router, "GET", "/auth/profile", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let app = test_app().await;
    signup(&app.router, "alice@example.com").await;

    let (status, body) = send_json(
        &app.router,
        "POST",
        "/auth/signup",
        None,
        Some(json!({
            "name": "Other",
            "email": "Alice@Example.com",
            "password": "secret2",
            "phone": "555-0101",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "This email is already registered");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = test_app().await;
    signup(&app.router, "alice@example.com").await;

    let (status_a, body_a) = send(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong" })),
    )
    .await;
    let (status_b, body_b) = send(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn forgot_password_bodies_are_identical() {
    let app = test_app().await;
    signup(&app.router, "alice@example.com").await;

    let (status_known, body_known) = send(
        &app.router,
        "POST",
        "/auth/forgot-password",
        None,
        Some(json!({ "email": "alice@example.com" })),
    )
    .await;
    let (status_unknown, body_unknown) = send(
        &app.router,
        "POST",
        "/auth/forgot-password",
        None,
        Some(json!({ "email": "nobody@example.com" })),
    )
    .await;

    assert_eq!(status_known, StatusCode::OK);
    assert_eq!(status_unknown, StatusCode::OK);
    assert_eq!(body_known, body_unknown);

    // Only the real account received an email.
    assert_eq!(app.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reset_password_flow() {
    let app = test_app().await;
    signup(&app.router, "alice@example.com").await;

    let code = ResetCode::new("alice@example.com", "246810".into());
    app.db.insert_reset_code(&code).await.unwrap();

    let (status, body) = send_json(
        &app.router,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({
            "email": "alice@example.com",
            "code": "246810",
            "newPassword": "secret2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // The code is gone after use.
    let (status, body) = send_json(
        &app.router,
        "POST",
        "/auth/reset-password",
        None,
        Some(json!({
            "email": "alice@example.com",
            "code": "246810",
            "newPassword": "secret3",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid or expired reset code");

    // Only the new password logs in.
    let (status, _) = send_json(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send_json(
        &app.router,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "secret2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn my_submission_is_empty_object_before_first_save() {
    let app = test_app().await;
    let token = signup(&app.router, "alice@example.com").await;

    let (status, body) = send_json(
        &app.router,
        "GET",
        "/onboarding/my-submission",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn onboarding_endpoints_require_auth() {
    let app = test_app().await;
    let (status, _) = send_json(
        &app.router,
        "POST",
        "/onboarding/save",
        None,
        Some(json!({ "currentStep": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send_json(&app.router, "GET", "/onboarding/my-submission", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app.router,
        "POST",
        "/onboarding/submit",
        None,
        Some(json!({
            "businessProfile": {},
            "voiceAgentConfig": {},
            "emailConfig": {},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn onboarding_save_and_resume() {
    let app = test_app().await;
    let token = signup(&app.router, "alice@example.com").await;

    let (status, ack) = send_json(
        &app.router,
        "POST",
        "/onboarding/save",
        Some(&token),
        Some(json!({
            "currentStep": 2,
            "businessProfile": { "businessName": "Summit Roofing" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
    assert_eq!(ack["currentStep"], 2);
    let submission_id = ack["submissionId"].as_str().unwrap().to_string();

    // A step-only save keeps the profile.
    let (status, _) = send_json(
        &app.router,
        "POST",
        "/onboarding/save",
        Some(&token),
        Some(json!({ "currentStep": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app.router,
        "GET",
        "/onboarding/my-submission",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSubmitted"], false);
    assert_eq!(body["currentStep"], 3);
    assert_eq!(body["submission"]["submissionId"], submission_id);
    assert_eq!(
        body["submission"]["businessProfile"]["businessName"],
        "Summit Roofing"
    );
}

#[tokio::test]
async fn onboarding_submit_finalizes_draft() {
    let app = test_app().await;
    let token = signup(&app.router, "alice@example.com").await;

    send_json(
        &app.router,
        "POST",
        "/onboarding/save",
        Some(&token),
        Some(json!({ "currentStep": 5 })),
    )
    .await;

    let (status, ack) = send_json(
        &app.router,
        "POST",
        "/onboarding/submit",
        Some(&token),
        Some(json!({
            "businessProfile": { "businessName": "Summit Roofing", "email": "owner@summit.com" },
            "voiceAgentConfig": { "agentName": "Sherpa" },
            "emailConfig": { "recipientEmail": "owner@summit.com" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);
    assert_eq!(
        ack["message"],
        "Your info has been successfully submitted. Admin will review and contact you soon."
    );

    let (_, body) = send_json(
        &app.router,
        "GET",
        "/onboarding/my-submission",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["isSubmitted"], true);
    assert_eq!(body["status"], "submitted");
    assert_eq!(body["currentStep"], 6);
    assert_eq!(body["submission"]["adminNotification"]["emailSent"], true);
    assert_eq!(
        body["submission"]["adminNotification"]["sentTo"],
        "admin@x.com"
    );
}

#[tokio::test]
async fn submit_succeeds_even_when_notification_fails() {
    let app = test_app_with(false).await;
    let token = signup(&app.router, "alice@example.com").await;

    let (status, ack) = send_json(
        &app.router,
        "POST",
        "/onboarding/submit",
        Some(&token),
        Some(json!({
            "businessProfile": { "businessName": "Summit Roofing" },
            "voiceAgentConfig": {},
            "emailConfig": {},
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["success"], true);

    let (_, body) = send_json(
        &app.router,
        "GET",
        "/onboarding/my-submission",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(body["submission"]["adminNotification"]["emailSent"], false);
}

#[tokio::test]
async fn preview_voice_rejects_empty_text() {
    let app = test_app().await;
    let (status, body) = send_json(
        &app.router,
        "POST",
        "/onboarding/preview-voice",
        None,
        Some(json!({ "text": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Text is required");
}
