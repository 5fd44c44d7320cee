//! Account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an account (role defaults to `user`)
//! verdant user create -u jordan -e jordan@example.com -p "long enough" -r editor
//!
//! # Change an existing account's role
//! verdant user promote -e jordan@example.com -r admin
//! ```
//!
//! # Environment Variables
//!
//! - `VERDANT_DATABASE_URL` - `SQLite` connection string (falls back to
//!   `DATABASE_URL`)

use thiserror::Error;

use verdant_core::{Email, Role};
use verdant_server::db::{self, RepositoryError, UserRepository};
use verdant_server::services::AuthService;
use verdant_server::services::auth::AuthError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Validation or uniqueness failure from the auth service.
    #[error("{0}")]
    Auth(#[from] AuthError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: user, editor, admin")]
    InvalidRole(String),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// No account with the given email.
    #[error("No account with email: {0}")]
    NoSuchUser(String),
}

/// Create a new account.
///
/// Registration goes through the auth service so the same username, email
/// and password rules apply as on the API; the role is set afterwards.
///
/// # Errors
///
/// Returns `UserError` if validation fails, the account exists, or the
/// database is unreachable.
pub async fn create(username: &str, email: &str, password: &str, role: &str) -> Result<i64, UserError> {
    dotenvy::dotenv().ok();

    // Parse and validate role
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let database_url =
        crate::commands::database_url().ok_or(UserError::MissingEnvVar("VERDANT_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating account: {} ({})", email, role);

    let user = AuthService::new(&pool).register(username, email, password).await?;

    if role != Role::User {
        UserRepository::new(&pool).set_role(user.id, role).await?;
    }

    tracing::info!(
        "Account created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        role
    );

    Ok(user.id.as_i64())
}

/// Change an existing account's role.
///
/// # Errors
///
/// Returns `UserError` if the role or email is invalid, no account matches,
/// or the database is unreachable.
pub async fn promote(email: &str, role: &str) -> Result<(), UserError> {
    dotenvy::dotenv().ok();

    // Parse and validate role
    let role: Role = role
        .parse()
        .map_err(|_| UserError::InvalidRole(role.to_owned()))?;

    let email = Email::parse(email).map_err(|e| UserError::InvalidEmail(e.to_string()))?;

    let database_url =
        crate::commands::database_url().ok_or(UserError::MissingEnvVar("VERDANT_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| UserError::NoSuchUser(email.to_string()))?;

    users.set_role(user.id, role).await?;

    tracing::info!("Role updated: {} is now {}", email, role);
    Ok(())
}
