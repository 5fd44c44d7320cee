//! Cookie session layer.
//!
//! Sessions live in the `SQLite` database via tower-sessions. The backing
//! table is created by `SqliteStore::migrate`, which the app builder runs
//! before serving.

use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::ServerConfig;

pub const SESSION_COOKIE_NAME: &str = "verdant_session";

/// Sessions lapse after 7 days without a request.
const SESSION_IDLE_EXPIRY: Duration = Duration::days(7);

/// Build the session layer over the given store.
///
/// The `Secure` cookie attribute follows the configured base URL scheme,
/// so plain-HTTP local runs still get a working cookie.
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &ServerConfig,
) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(SESSION_IDLE_EXPIRY))
        .with_secure(config.secure_cookies())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
