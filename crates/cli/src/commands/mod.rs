//! CLI command implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;

/// Resolve the database URL from `VERDANT_DATABASE_URL`, falling back to the
/// generic `DATABASE_URL` used by sqlx tooling.
pub(crate) fn database_url() -> Option<SecretString> {
    std::env::var("VERDANT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
