//! The handler-facing error type.
//!
//! Every route returns `Result<T, AppError>`; the `IntoResponse` impl turns
//! the error into a `{"error": message}` JSON body with the right status
//! and reports server-class failures to Sentry before responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::identity::IdentityError;
use crate::services::auth::AuthError;

#[derive(Debug, Error)]
pub enum AppError {
    /// A repository call failed for a non-semantic reason.
    #[error("database error: {0}")]
    Database(RepositoryError),

    /// The identity provider misbehaved on a primary path.
    #[error("identity provider error: {0}")]
    Identity(#[from] IdentityError),

    /// Registration/login/account-update failure.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The session store failed to read or write.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Client input failed validation, or a self-action is prohibited.
    #[error("validation error: {0}")]
    Validation(String),

    /// The named entity has no row.
    #[error("{0} not found")]
    NotFound(String),

    /// No authenticated principal on a guarded route.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the role doesn't reach the route's bar.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A write collided with a uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Anything else that should page someone.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Repository misses and unique violations carry client-facing status codes;
/// everything else from the gateway is a server fault.
impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl AppError {
    /// Status code plus the client-facing message. Server-class failures
    /// share a generic message; the real cause stays in logs and Sentry.
    fn status_and_message(&self) -> (StatusCode, String) {
        const INTERNAL: &str = "Internal server error";

        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
            }
            Self::Identity(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Identity provider error".to_string(),
            ),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
                }
                AuthError::UserAlreadyExists => (
                    StatusCode::BAD_REQUEST,
                    "An account with this email or username already exists".to_string(),
                ),
                AuthError::WeakPassword(msg) | AuthError::InvalidUsername(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_string())
                }
                AuthError::PasswordHash(_) | AuthError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
            },
            Self::Validation(msg) | Self::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
        }
    }

    /// Faults worth a Sentry event, as opposed to expected client errors.
    const fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Identity(_) | Self::Session(_) | Self::Internal(_)
        ) || matches!(
            self,
            Self::Auth(AuthError::PasswordHash(_) | AuthError::Database(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "request failed");
        }

        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Tag the Sentry scope with the resolved principal so later errors on
/// this request name the account.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Drop the principal from the Sentry scope (logout).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product".to_string());
        assert_eq!(err.to_string(), "Product not found");

        let err = AppError::Validation("price must not be negative".to_string());
        assert_eq!(err.to_string(), "validation error: price must not be negative");
    }

    #[test]
    fn test_status_codes_by_class() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Validation("x".into()), StatusCode::BAD_REQUEST),
            // Unique violations deliberately land in the 400 class, not 409.
            (AppError::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_message().0, expected);
        }
    }

    #[test]
    fn test_repository_errors_map_to_client_statuses() {
        let err: AppError = RepositoryError::NotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = RepositoryError::Conflict("slug already exists".to_string()).into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = RepositoryError::DataCorruption("bad role".to_string()).into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let err = AppError::Internal("connection pool exhausted".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_message_reaches_the_client() {
        let err = AppError::Validation("limit must be between 1 and 100".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "limit must be between 1 and 100");
    }
}
