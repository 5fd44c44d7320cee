//! Authentication service.
//!
//! Provides password registration/login and the account side of federated
//! login: linking a verified external identity to an existing account, or
//! provisioning a fresh one on first login.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;

use verdant_core::{Email, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::AppError;
use crate::identity::VerifiedIdentity;
use crate::models::{AccountChanges, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Username length bounds.
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 32;

/// How many suffixed candidates to try when a derived username collides.
const PROVISION_ATTEMPTS: u32 = 5;

/// Authentication service.
///
/// Handles registration, password login, account updates, and federated
/// account provisioning.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with username, email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `AuthError::InvalidEmail` /
    /// `AuthError::WeakPassword` if a field fails validation.
    /// Returns `AuthError::UserAlreadyExists` if the username or email is
    /// taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = validate_username(username)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create_local(&username, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Database(other),
            })?;

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// Accounts provisioned purely from a federated identity carry no
    /// password hash and cannot log in this way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let user = self
            .users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, hash)?;

        // Best-effort; a failed timestamp must not fail the login.
        if let Err(err) = self.users.touch_last_login(user.id).await {
            tracing::warn!(error = %err, user_id = %user.id, "failed to record login time");
        }

        Ok(user)
    }

    /// Apply sparse account changes and return the updated user.
    ///
    /// Handles validation and password hashing; the write is a single
    /// statement. Callers decide who may set `role`.
    ///
    /// # Errors
    ///
    /// Returns validation errors as 400-class `AppError`s, `NotFound` if the
    /// user doesn't exist, and `Conflict` if the username or email is taken.
    pub async fn update_account(
        &self,
        id: UserId,
        changes: AccountChanges,
    ) -> Result<User, AppError> {
        if changes.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }

        let username = match changes.username.as_deref() {
            Some(raw) => Some(validate_username(raw)?),
            None => None,
        };
        let email = match changes.email.as_deref() {
            Some(raw) => Some(Email::parse(raw).map_err(AuthError::from)?),
            None => None,
        };
        let password_hash = match changes.password.as_deref() {
            Some(raw) => {
                validate_password(raw)?;
                Some(hash_password(raw)?)
            }
            None => None,
        };

        match self
            .users
            .update_account(
                id,
                username.as_deref(),
                email.as_ref(),
                password_hash.as_deref(),
                changes.role,
            )
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                return Err(AppError::NotFound("User".to_string()));
            }
            Err(other) => return Err(other.into()),
        }

        self.users
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    /// Resolve a verified federated identity to a local account.
    ///
    /// Order: existing link by external uid; else link by verified email to
    /// an existing account; else provision a fresh `user`-role account with
    /// a username derived from the email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` when the identity carries no
    /// verified email and no account can be linked or created.
    pub async fn link_or_provision(&self, identity: &VerifiedIdentity) -> Result<User, AuthError> {
        if let Some(user) = self.users.get_by_external_uid(&identity.uid).await? {
            return Ok(user);
        }

        let Some(email) = identity.email.clone() else {
            tracing::debug!(uid = %identity.uid, "federated identity has no verified email");
            return Err(AuthError::InvalidCredentials);
        };

        if let Some(mut user) = self.users.get_by_email(&email).await? {
            self.users.set_external_uid(user.id, &identity.uid).await?;
            user.external_uid = Some(identity.uid.clone());
            tracing::info!(user_id = %user.id, "linked federated identity to existing account");
            return Ok(user);
        }

        let base = derive_username(&email);
        for attempt in 0..PROVISION_ATTEMPTS {
            let candidate = if attempt == 0 {
                base.clone()
            } else {
                format!("{base}-{attempt}")
            };
            match self
                .users
                .create_federated(&candidate, &email, &identity.uid)
                .await
            {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "provisioned account from federated identity");
                    return Ok(user);
                }
                Err(RepositoryError::Conflict(_)) => {}
                Err(other) => return Err(AuthError::Database(other)),
            }
        }

        // Suffix with a uid fragment as the last resort; a conflict here
        // means the email itself is contested.
        let candidate = format!("{base}-{}", sanitize_fragment(&identity.uid, 8));
        self.users
            .create_federated(&candidate, &email, &identity.uid)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Database(other),
            })
    }
}

/// Validate a password against the strength rules.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Validate and trim a username: `[A-Za-z0-9_-]`, bounded length.
fn validate_username(username: &str) -> Result<String, AuthError> {
    let username = username.trim();
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(AuthError::InvalidUsername(format!(
            "username must be {MIN_USERNAME_LENGTH} to {MAX_USERNAME_LENGTH} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::InvalidUsername(
            "username may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    Ok(username.to_string())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// Verify a password against a stored hash.
///
/// A hash that fails to parse is a stored-data fault, not a wrong password.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Derive a username candidate from an email's local part.
fn derive_username(email: &Email) -> String {
    let name = sanitize_fragment(email.local_part(), 24);
    if name.len() < MIN_USERNAME_LENGTH {
        "member".to_string()
    } else {
        name
    }
}

/// Keep only username-safe ASCII, replacing the rest with hyphens.
fn sanitize_fragment(raw: &str, max_len: usize) -> String {
    let mut fragment: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    fragment.truncate(max_len);
    fragment.trim_matches('-').to_string()
}
