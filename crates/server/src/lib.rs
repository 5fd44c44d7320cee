//! Verdant Market server library.
//!
//! This crate provides the HTTP backend as a library, allowing it to be
//! tested end-to-end and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::ExpiredDeletion;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::Span;

use crate::config::ServerConfig;
use crate::state::AppState;

/// How often the background task sweeps expired sessions.
const SESSION_SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(600);

/// Build the application router with the full middleware stack.
///
/// Prepares the session store (creating its table if missing) and spawns
/// the expired-session sweeper before assembling the router. The Sentry
/// tower layers are not included; the binary adds them outermost.
///
/// # Errors
///
/// Returns `sqlx::Error` if the session store cannot set up its table.
pub async fn build_app(state: AppState) -> Result<Router, sqlx::Error> {
    let session_store = SqliteStore::new(state.pool().clone());
    session_store.migrate().await?;

    tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(SESSION_SWEEP_PERIOD),
    );

    let session_layer = middleware::create_session_layer(session_store, state.config());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
                status = tracing::field::Empty,
                latency_ms = tracing::field::Empty,
            )
        })
        .on_response(
            |response: &axum::http::Response<_>, latency: std::time::Duration, span: &Span| {
                span.record("status", response.status().as_u16());
                span.record(
                    "latency_ms",
                    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                );
                DefaultOnResponse::default().on_response(response, latency, span);
            },
        );

    // Layer order, outermost last: trace wraps request ID wraps CORS wraps
    // sessions wraps principal resolution wraps the routes.
    let app = routes::routes()
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_principal,
        ))
        .layer(session_layer)
        .layer(cors_layer(state.config()))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(trace_layer)
        .with_state(state);

    Ok(app)
}

/// CORS policy from configuration.
///
/// Without explicit origins the policy is permissive, which suits local
/// development; explicit origins additionally allow credentials so browser
/// clients can send the session cookie.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
