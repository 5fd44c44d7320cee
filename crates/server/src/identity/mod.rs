//! Identity provider adapter for federated login.
//!
//! The provider owns token issuance; this side only verifies tokens, looks
//! up accounts by email during provisioning, and revokes accounts when an
//! admin deletes the local user.

mod client;

pub use client::IdentityClient;

use async_trait::async_trait;
use thiserror::Error;

use verdant_core::Email;

/// Errors that can occur when talking to the identity provider.
///
/// Invalid or unknown tokens are NOT errors; they surface as `Ok(None)`
/// from [`IdentityProvider::verify_token`].
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The provider answered with an unexpected failure.
    #[error("provider error (HTTP {status}): {message}")]
    Provider { status: u16, message: String },
}

/// A token the provider accepted.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    /// Provider-scoped account id.
    pub uid: String,
    /// The account's email, only when the provider reports it verified.
    pub email: Option<Email>,
}

/// Seam over the identity provider's account surface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify a bearer token.
    ///
    /// Returns `Ok(None)` for invalid, expired or unknown tokens; those are
    /// normal authentication negatives, not faults.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` for transport failures and unexpected
    /// provider responses.
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedIdentity>, IdentityError>;

    /// Find the provider uid holding the given email, if any.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` for transport failures and unexpected
    /// provider responses.
    async fn lookup_by_email(&self, email: &Email) -> Result<Option<String>, IdentityError>;

    /// Delete the provider account. Deleting an unknown uid succeeds.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` for transport failures and unexpected
    /// provider responses.
    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;
}

/// Stand-in used when provider credentials are not configured.
///
/// Every token verification is a normal authentication failure, so
/// password-and-session login keeps working without a provider.
pub struct DisabledIdentity;

#[async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn verify_token(&self, _token: &str) -> Result<Option<VerifiedIdentity>, IdentityError> {
        tracing::debug!("bearer token presented but no identity provider is configured");
        Ok(None)
    }

    async fn lookup_by_email(&self, _email: &Email) -> Result<Option<String>, IdentityError> {
        Ok(None)
    }

    async fn delete_account(&self, _uid: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}
