//! Integration tests for registration, login, sessions and the profile
//! surface.
//!
//! Each test runs against its own in-process server; see `common::TestApp`.

mod common;

use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use uuid::Uuid;

use common::{TestApp, client_as, cookie_client};

/// Unique email so re-running a test never collides inside one suite.
fn unique_email(tag: &str) -> String {
    format!("{tag}-{}@example.com", Uuid::new_v4().simple())
}

async fn register(
    app: &TestApp,
    client: &Client,
    username: &str,
    email: &str,
    password: &str,
) -> Value {
    let response = client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse register body")
}

// ============================================================================
// Registration & Session Tests
// ============================================================================

#[tokio::test]
async fn test_register_creates_account_and_session() {
    let app = TestApp::spawn().await;
    let email = unique_email("reg");

    let body = register(&app, &app.client, "first-member", &email, "long enough pw").await;
    assert_eq!(body["username"], "first-member");
    assert_eq!(body["email"], email.as_str());
    assert_eq!(body["role"], "user");
    assert!(body["id"].as_i64().is_some());
    assert!(body.get("password_hash").is_none());

    // The register response set a session cookie; /me works immediately.
    let response = app
        .client
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    assert_eq!(response.status(), StatusCode::OK);
    let me: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(me["email"], email.as_str());
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let app = TestApp::spawn().await;
    let email = unique_email("dup");

    register(&app, &app.client, "original-name", &email, "long enough pw").await;

    let response = cookie_client()
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "different-name",
            "email": email,
            "password": "long enough pw",
        }))
        .send()
        .await
        .expect("Failed to send duplicate registration");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(
        body["error"],
        "An account with this email or username already exists"
    );
}

#[tokio::test]
async fn test_register_enforces_credential_rules() {
    let app = TestApp::spawn().await;

    // Password below the minimum length.
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "valid-name",
            "email": unique_email("weak"),
            "password": "short",
        }))
        .send()
        .await
        .expect("Failed to send registration");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Username outside the allowed shape.
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({
            "username": "has spaces",
            "email": unique_email("name"),
            "password": "long enough pw",
        }))
        .send()
        .await
        .expect("Failed to send registration");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_round_trip_and_logout() {
    let app = TestApp::spawn().await;
    let email = unique_email("login");
    register(&app, &cookie_client(), "login-member", &email, "long enough pw").await;

    // Fresh client: no session until login.
    let client = cookie_client();
    let response = client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "long enough pw" }))
        .send()
        .await
        .expect("Failed to login");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["username"], "login-member");

    // The login was recorded; /me re-reads the row.
    let response = client
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    let me: Value = response.json().await.expect("Failed to parse body");
    assert!(me["last_login_at"].is_string());

    let response = client
        .post(app.url("/api/auth/logout"))
        .send()
        .await
        .expect("Failed to logout");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["success"], true);

    // The session is gone.
    let response = client
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let app = TestApp::spawn().await;
    let email = unique_email("wrongpw");
    register(&app, &cookie_client(), "wrongpw-member", &email, "long enough pw").await;

    let response = cookie_client()
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "not the password" }))
        .send()
        .await
        .expect("Failed to send login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_me_requires_authentication() {
    let app = TestApp::spawn().await;

    let response = Client::new()
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "authentication required");
}

// ============================================================================
// Profile Tests
// ============================================================================

#[tokio::test]
async fn test_profile_updates_username_and_password() {
    let app = TestApp::spawn().await;
    let email = unique_email("profile");
    register(&app, &app.client, "before-rename", &email, "long enough pw").await;

    let response = app
        .client
        .put(app.url("/api/auth/profile"))
        .json(&json!({ "username": "after-rename", "password": "a brand new pw" }))
        .send()
        .await
        .expect("Failed to update profile");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["username"], "after-rename");

    // The old password no longer works, the new one does.
    let response = cookie_client()
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "long enough pw" }))
        .send()
        .await
        .expect("Failed to send login");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = cookie_client()
        .post(app.url("/api/auth/login"))
        .json(&json!({ "email": email, "password": "a brand new pw" }))
        .send()
        .await
        .expect("Failed to send login");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_profile_cannot_touch_role() {
    let app = TestApp::spawn().await;
    register(
        &app,
        &app.client,
        "plain-member",
        &unique_email("norole"),
        "long enough pw",
    )
    .await;

    // `role` is not a profile field; with nothing else in the body the
    // changeset is empty.
    let response = app
        .client
        .put(app.url("/api/auth/profile"))
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .expect("Failed to send profile update");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["error"], "no fields to update");

    let response = app
        .client
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    let me: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(me["role"], "user");
}

// ============================================================================
// Development Credential Tests
// ============================================================================

#[tokio::test]
async fn test_dev_header_resolves_principal() {
    let app = TestApp::spawn().await;
    let editor_id = app
        .create_staff("header-editor", &unique_email("hdr"), "editor")
        .await;

    let response = client_as(editor_id)
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["id"], editor_id);
    assert_eq!(body["role"], "editor");
}

#[tokio::test]
async fn test_dev_bearer_token_resolves_principal() {
    let app = TestApp::spawn().await;
    let user_id = app
        .create_staff("token-member", &unique_email("tok"), "user")
        .await;

    let token = format!(
        "dev-{}",
        base64::engine::general_purpose::STANDARD.encode(user_id.to_string())
    );
    let response = Client::new()
        .get(app.url("/api/auth/me"))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to get current account");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse body");
    assert_eq!(body["id"], user_id);
}

#[tokio::test]
async fn test_dev_header_with_unknown_user_stays_anonymous() {
    let app = TestApp::spawn().await;

    let response = client_as(999_999)
        .get(app.url("/api/auth/me"))
        .send()
        .await
        .expect("Failed to get current account");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
