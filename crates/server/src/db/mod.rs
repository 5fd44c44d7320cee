//! Database operations for the `SQLite` store.
//!
//! `SQLite` is the source of truth for all application data.
//!
//! ## Tables
//!
//! - `users` - Accounts (local password and/or federated identity)
//! - `categories` - Shared taxonomy for products and blog posts
//! - `products` - Catalog entries with dietary flags and ingredients
//! - `vendors` - Per-product purchase links
//! - `blog_posts` - Blog content with publish/feature state
//! - `blog_post_categories` - Post/category membership
//! - `tower_sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p verdant-cli -- migrate
//! ```

pub mod categories;
pub mod posts;
pub mod products;
pub mod users;
pub mod vendors;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use thiserror::Error;

pub use categories::CategoryRepository;
pub use posts::PostRepository;
pub use products::ProductRepository;
pub use users::UserRepository;
pub use vendors::VendorRepository;

/// Embedded migrations, applied by the CLI and the test fixtures.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// WAL journaling with `synchronous = NORMAL` keeps single-writer latency
/// low; the busy timeout covers writer contention from the session store.
///
/// # Arguments
///
/// * `database_url` - `SQLite` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Escape `LIKE` metacharacters in a user-supplied search term.
///
/// The result is meant for a pattern bound alongside `ESCAPE '\'`.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_passes_plain_terms_through() {
        assert_eq!(escape_like("oat milk"), "oat milk");
    }

    #[test]
    fn test_escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("100%_pure"), "100\\%\\_pure");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }
}
