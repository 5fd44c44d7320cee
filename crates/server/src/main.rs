//! Verdant Market server - JSON HTTP backend.
//!
//! Serves the storefront and the admin dashboard over one JSON API,
//! listening on port 4000 by default.
//!
//! # Architecture
//!
//! - Axum handlers returning JSON throughout
//! - `SQLite` as the source of truth for catalog, blog, and account data
//! - Google Identity Toolkit for federated bearer-token login
//! - tower-sessions cookie sessions backed by the same `SQLite` file
//!
//! Role enforcement happens per route: anonymous reads, editor writes,
//! admin user management. Migrations never run here; apply them with
//! `verdant-cli migrate` before starting the server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use verdant_server::config::ServerConfig;
use verdant_server::state::AppState;
use verdant_server::{build_app, db};

/// Fallback log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "verdant_server=info,tower_http=debug";

#[tokio::main]
async fn main() {
    let config = ServerConfig::from_env().expect("configuration error");

    // Sentry first so the tracing layer below can feed it; the guard has to
    // outlive the server to flush on exit.
    let _sentry_guard = init_observability(&config);

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("database pool error");
    tracing::info!("database pool ready");

    let addr = config.socket_addr();
    let state = AppState::new(config, pool);

    let app = build_app(state)
        .await
        .expect("session store setup error")
        // Sentry tower layers go outermost so every request gets a hub.
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("cannot bind {addr}: {e}"));
    tracing::info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Set up Sentry (when a DSN is configured) and the tracing subscriber.
///
/// Warnings and errors become Sentry events, info and debug become
/// breadcrumbs attached to them.
fn init_observability(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                attach_stacktrace: true,
                ..Default::default()
            },
        ))
    });

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let sentry_layer = sentry_tracing::layer().event_filter(|metadata| match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    if guard.is_some() {
        tracing::info!("sentry error tracking enabled");
    }
    guard
}

/// Resolve on SIGINT or SIGTERM so in-flight requests can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("ctrl-c handler error");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("signal handler error")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
