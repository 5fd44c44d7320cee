//! Integration tests for the admin account-management surface.
//!
//! Each test runs against its own in-process server; see `common::TestApp`.

mod common;

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use common::{TestApp, client_as};

/// Spawn an app plus a client authenticated as a fresh admin.
async fn spawn_with_admin() -> (TestApp, i64, Client) {
    let app = TestApp::spawn().await;
    let admin_id = app
        .create_staff("accounts-admin", "accounts-admin@example.com", "admin")
        .await;
    let admin = client_as(admin_id);
    (app, admin_id, admin)
}

async fn list_users(app: &TestApp, client: &Client) -> Vec<Value> {
    let response = client
        .get(app.url("/api/users"))
        .send()
        .await
        .expect("Failed to list users");
    assert_eq!(response.status(), StatusCode::OK);
    response.json().await.expect("Failed to parse user list")
}

// ============================================================================
// Admin Gate Tests
// ============================================================================

#[tokio::test]
async fn test_user_routes_reject_anonymous() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(app.url("/api/users"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_routes_reject_editor() {
    let (app, _admin_id, _admin) = spawn_with_admin().await;
    let editor_id = app
        .create_staff("mere-editor", "mere-editor@example.com", "editor")
        .await;
    let editor = client_as(editor_id);

    let response = editor
        .get(app.url("/api/users"))
        .send()
        .await
        .expect("Failed to list users as editor");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The same gate holds for writes.
    let response = editor
        .put(app.url(&format!("/api/users/{editor_id}")))
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .expect("Failed to send role change as editor");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = editor
        .delete(app.url(&format!("/api/users/{editor_id}")))
        .send()
        .await
        .expect("Failed to send delete as editor");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Listing & Retrieval Tests
// ============================================================================

#[tokio::test]
async fn test_admin_lists_and_retrieves_accounts() {
    let (app, admin_id, admin) = spawn_with_admin().await;
    let member_id = app
        .create_staff("regular-member", "regular-member@example.com", "user")
        .await;

    let users = list_users(&app, &admin).await;
    let ids: Vec<i64> = users
        .iter()
        .map(|u| u["id"].as_i64().expect("user missing id"))
        .collect();
    assert!(ids.contains(&admin_id));
    assert!(ids.contains(&member_id));
    for user in &users {
        assert!(user.get("password_hash").is_none());
    }

    let response = admin
        .get(app.url(&format!("/api/users/{member_id}")))
        .send()
        .await
        .expect("Failed to retrieve account");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse account");
    assert_eq!(body["username"], "regular-member");
    assert_eq!(body["role"], "user");

    let response = admin
        .get(app.url("/api/users/999999"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Role Change Tests
// ============================================================================

#[tokio::test]
async fn test_admin_promotes_account_to_editor() {
    let (app, _admin_id, admin) = spawn_with_admin().await;
    let member_id = app
        .create_staff("future-editor", "future-editor@example.com", "user")
        .await;

    let response = admin
        .put(app.url(&format!("/api/users/{member_id}")))
        .json(&json!({ "role": "editor" }))
        .send()
        .await
        .expect("Failed to change role");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse account");
    assert_eq!(body["role"], "editor");

    // The promotion takes effect without re-login: the account can now
    // use an editor-only route.
    let promoted = client_as(member_id);
    let response = promoted
        .post(app.url("/api/categories"))
        .json(&json!({ "name": "Granted" }))
        .send()
        .await
        .expect("Failed to create category as promoted editor");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_empty_account_update_is_rejected() {
    let (app, admin_id, admin) = spawn_with_admin().await;

    let response = admin
        .put(app.url(&format!("/api/users/{admin_id}")))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send empty update");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Deletion Tests
// ============================================================================

#[tokio::test]
async fn test_admin_cannot_delete_own_account() {
    let (app, admin_id, admin) = spawn_with_admin().await;

    let response = admin
        .delete(app.url(&format!("/api/users/{admin_id}")))
        .send()
        .await
        .expect("Failed to send self-delete");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The account is untouched.
    let users = list_users(&app, &admin).await;
    assert!(
        users
            .iter()
            .any(|u| u["id"].as_i64() == Some(admin_id))
    );
}

#[tokio::test]
async fn test_admin_deletes_another_account() {
    let (app, _admin_id, admin) = spawn_with_admin().await;
    let member_id = app
        .create_staff("departing-member", "departing-member@example.com", "user")
        .await;

    let response = admin
        .delete(app.url(&format!("/api/users/{member_id}")))
        .send()
        .await
        .expect("Failed to delete account");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse delete body");
    assert_eq!(body["success"], true);

    let response = admin
        .get(app.url(&format!("/api/users/{member_id}")))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
