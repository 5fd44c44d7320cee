//! Failure modes of register, login, and account update.

use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// The submitted email did not parse.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] verdant_core::EmailError),

    /// Wrong password, or no account with that email. Collapsed into one
    /// variant so the response cannot be used to probe which emails exist.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The email or username is already taken.
    #[error("user already exists")]
    UserAlreadyExists,

    /// The password failed the strength rules.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The username is outside the allowed shape.
    #[error("username validation failed: {0}")]
    InvalidUsername(String),

    /// Hashing a new password or parsing a stored hash failed.
    #[error("password hashing error: {0}")]
    PasswordHash(String),

    /// A repository call underneath the auth flow failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
}
