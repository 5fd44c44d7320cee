//! Shared harness for the API integration tests.
//!
//! Every test spawns its own server on an ephemeral port backed by a
//! throwaway `SQLite` database, so suites stay independent and run in
//! parallel. Staff principals authenticate through the development header,
//! which the harness enables via the `dev-auth` feature.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::SqlitePool;

use verdant_server::config::ServerConfig;
use verdant_server::middleware::auth::DEV_USER_HEADER;
use verdant_server::state::AppState;
use verdant_server::{build_app, db};

/// A running server instance plus the handles tests need to talk to it.
pub struct TestApp {
    pub base_url: String,
    /// Cookie-carrying client for session flows.
    pub client: Client,
    pub pool: SqlitePool,
    _data_dir: tempfile::TempDir,
}

impl TestApp {
    /// Spawn a fresh server instance.
    pub async fn spawn() -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = data_dir.path().join("verdant-test.db");
        let database_url = SecretString::from(format!("sqlite://{}", db_path.display()));

        let config = ServerConfig {
            database_url: database_url.clone(),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://localhost:4000".to_string(),
            allowed_origins: Vec::new(),
            identity: None,
            dev_auth: true,
            sentry_dsn: None,
        };

        let pool = db::create_pool(&database_url)
            .await
            .expect("Failed to open test database");
        db::MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let app = build_app(AppState::new(config, pool.clone()))
            .await
            .expect("Failed to build app");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read listener address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Server stopped unexpectedly");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: cookie_client(),
            pool,
            _data_dir: data_dir,
        }
    }

    /// Absolute URL for a path on this instance.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Register an account through the API and grant it a role directly in
    /// the database. Returns the new user id.
    pub async fn create_staff(&self, username: &str, email: &str, role: &str) -> i64 {
        let response = Client::new()
            .post(self.url("/api/auth/register"))
            .json(&json!({
                "username": username,
                "email": email,
                "password": "plenty-long-password",
            }))
            .send()
            .await
            .expect("Failed to register staff account");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body: Value = response
            .json()
            .await
            .expect("Failed to parse register response");
        let id = body["id"].as_i64().expect("register response missing id");

        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(&self.pool)
            .await
            .expect("Failed to assign role");

        id
    }
}

/// Client with a cookie jar, for session-based flows.
pub fn cookie_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Client that authenticates as the given user on every request via the
/// development principal header.
pub fn client_as(user_id: i64) -> Client {
    let mut headers = HeaderMap::new();
    headers.insert(
        DEV_USER_HEADER,
        HeaderValue::from_str(&user_id.to_string()).expect("Failed to build header value"),
    );
    Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}
