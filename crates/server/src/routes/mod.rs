//! HTTP route handlers for the API server.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//! GET  /health/ready                  - Readiness check (DB connectivity)
//!
//! # Auth
//! POST /api/auth/register             - Create account + session
//! POST /api/auth/login                - Password login + session
//! POST /api/auth/logout               - Destroy session            [authed]
//! GET  /api/auth/me                   - Current account            [authed]
//! PUT  /api/auth/profile              - Partial self-update        [authed]
//!
//! # Products
//! GET    /api/products                - Filtered, paginated list
//! POST   /api/products                - Create                     [editor]
//! GET    /api/products/{id}           - Enriched retrieve
//! PATCH  /api/products/{id}           - Partial update             [editor]
//! DELETE /api/products/{id}           - Delete with offers         [editor]
//! PUT    /api/products/{id}/features  - Full flag overwrite        [editor]
//! GET    /api/products/{id}/related   - Related products
//! GET    /api/products/{id}/vendors   - Vendor offers
//!
//! # Categories
//! GET    /api/categories              - List
//! POST   /api/categories              - Create                     [editor]
//! PUT    /api/categories/{id}         - Update                     [editor]
//! DELETE /api/categories/{id}         - Delete                     [editor]
//!
//! # Vendors
//! POST   /api/vendors                 - Create offer               [editor]
//! PUT    /api/vendors/{id}            - Update offer               [editor]
//! DELETE /api/vendors/{id}            - Delete offer               [editor]
//!
//! # Blog
//! GET    /api/blog/posts              - Filtered, paginated list
//! POST   /api/blog/posts              - Create                     [editor]
//! GET    /api/blog/posts/featured     - The featured post
//! GET    /api/blog/posts/slug/{slug}  - Retrieve by slug
//! GET    /api/blog/posts/{id}         - Enriched retrieve
//! PUT    /api/blog/posts/{id}         - Partial update             [editor]
//! DELETE /api/blog/posts/{id}         - Delete                     [editor]
//! PUT    /api/blog/posts/{id}/featured - Set featured              [editor]
//! GET    /api/blog/posts/{id}/related - Related posts
//! POST   /api/blog/posts/{id}/categories - Add membership          [editor]
//! DELETE /api/blog/posts/{id}/categories/{category_id}
//!                                     - Remove membership          [editor]
//! GET    /api/blog/categories         - Categories usable for posts
//!
//! # Users
//! GET    /api/users                   - List accounts              [admin]
//! GET    /api/users/{id}              - Retrieve account           [admin]
//! PUT    /api/users/{id}              - Update incl. role          [admin]
//! DELETE /api/users/{id}              - Delete, never self         [admin]
//! ```

pub mod auth;
pub mod blog;
pub mod categories;
pub mod products;
pub mod users;
pub mod vendors;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;

use crate::state::AppState;

/// Create all routes for the API server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth::router())
        .nest("/api/products", products::router())
        .nest("/api/categories", categories::router())
        .nest("/api/vendors", vendors::router())
        .nest("/api/blog", blog::router())
        .nest("/api/users", users::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
