//! HTTP implementation of the identity provider adapter.
//!
//! Targets the provider's Identity Toolkit-style REST surface: one POST per
//! operation (`accounts:lookup`, `accounts:delete`), the server key as a
//! query parameter, and failures reported as an `error.message` code such
//! as `INVALID_ID_TOKEN` or `EMAIL_NOT_FOUND`.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

use verdant_core::Email;

use super::{IdentityError, IdentityProvider, VerifiedIdentity};
use crate::config::IdentityConfig;

/// Token rejections the provider reports as client errors; all of them mean
/// "not authenticated", not "something broke".
const TOKEN_REJECTIONS: &[&str] = &[
    "INVALID_ID_TOKEN",
    "TOKEN_EXPIRED",
    "USER_NOT_FOUND",
    "USER_DISABLED",
];

/// REST client for the identity provider.
pub struct IdentityClient {
    http: reqwest::Client,
    config: IdentityConfig,
}

/// Status and raw body of a provider response, kept separate so the
/// interpretation logic stays unit-testable.
struct ProviderReply {
    status: StatusCode,
    body: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<ProviderUser>,
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    #[serde(rename = "localId")]
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(rename = "emailVerified", default)]
    email_verified: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
}

impl IdentityClient {
    /// Create a new provider client.
    #[must_use]
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// POST one provider operation and capture the raw reply.
    async fn post(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<ProviderReply, IdentityError> {
        let url = format!("{}/accounts:{operation}", self.config.api_base);
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.server_key.expose_secret())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        Ok(ProviderReply { status, body })
    }
}

#[async_trait]
impl IdentityProvider for IdentityClient {
    async fn verify_token(&self, token: &str) -> Result<Option<VerifiedIdentity>, IdentityError> {
        let reply = self.post("lookup", json!({ "idToken": token })).await?;
        if reply.status.is_success() {
            return parse_verified(&reply.body);
        }

        let message = error_message(&reply.body);
        if reply.status.is_client_error() && is_token_rejection(&message) {
            tracing::debug!(reason = %message, "identity provider rejected token");
            return Ok(None);
        }
        Err(IdentityError::Provider {
            status: reply.status.as_u16(),
            message,
        })
    }

    async fn lookup_by_email(&self, email: &Email) -> Result<Option<String>, IdentityError> {
        let reply = self
            .post("lookup", json!({ "email": [email.as_str()] }))
            .await?;
        if reply.status.is_success() {
            let response: LookupResponse = serde_json::from_str(&reply.body)?;
            return Ok(response.users.into_iter().next().map(|user| user.local_id));
        }

        let message = error_message(&reply.body);
        if reply.status.is_client_error() && message.starts_with("EMAIL_NOT_FOUND") {
            return Ok(None);
        }
        Err(IdentityError::Provider {
            status: reply.status.as_u16(),
            message,
        })
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let reply = self.post("delete", json!({ "localId": uid })).await?;
        if reply.status.is_success() {
            return Ok(());
        }

        let message = error_message(&reply.body);
        // The account being gone is the outcome we wanted.
        if reply.status.is_client_error() && message.starts_with("USER_NOT_FOUND") {
            return Ok(());
        }
        Err(IdentityError::Provider {
            status: reply.status.as_u16(),
            message,
        })
    }
}

/// Interpret a successful lookup body as a verified identity.
///
/// An unverified email is withheld: linking a local account to it would let
/// an attacker claim an address they don't control.
fn parse_verified(body: &str) -> Result<Option<VerifiedIdentity>, IdentityError> {
    let response: LookupResponse = serde_json::from_str(body)?;
    let Some(user) = response.users.into_iter().next() else {
        return Ok(None);
    };

    let email = match user.email {
        Some(raw) if user.email_verified => Email::parse(&raw).ok(),
        _ => None,
    };
    Ok(Some(VerifiedIdentity {
        uid: user.local_id,
        email,
    }))
}

/// Pull the provider's error code out of a failure body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .map(|response| response.error.message)
        .unwrap_or_default()
}

/// Provider messages can carry suffixes (e.g. `TOKEN_EXPIRED : ...`), so
/// match on the prefix.
fn is_token_rejection(message: &str) -> bool {
    TOKEN_REJECTIONS
        .iter()
        .any(|rejection| message.starts_with(rejection))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verified_keeps_verified_email() {
        let body = r#"{"users":[{"localId":"uid-1","email":"a@example.com","emailVerified":true}]}"#;
        let identity = parse_verified(body).unwrap().unwrap();
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.email.unwrap().as_str(), "a@example.com");
    }

    #[test]
    fn test_parse_verified_withholds_unverified_email() {
        let body =
            r#"{"users":[{"localId":"uid-1","email":"a@example.com","emailVerified":false}]}"#;
        let identity = parse_verified(body).unwrap().unwrap();
        assert_eq!(identity.uid, "uid-1");
        assert!(identity.email.is_none());
    }

    #[test]
    fn test_parse_verified_empty_users_is_negative() {
        assert!(parse_verified(r#"{"users":[]}"#).unwrap().is_none());
        assert!(parse_verified("{}").unwrap().is_none());
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"code":400,"message":"INVALID_ID_TOKEN"}}"#;
        assert_eq!(error_message(body), "INVALID_ID_TOKEN");
        assert_eq!(error_message("not json"), "");
    }

    #[test]
    fn test_token_rejections_match_on_prefix() {
        assert!(is_token_rejection("TOKEN_EXPIRED"));
        assert!(is_token_rejection("USER_NOT_FOUND : no account"));
        assert!(!is_token_rejection("QUOTA_EXCEEDED"));
    }
}
