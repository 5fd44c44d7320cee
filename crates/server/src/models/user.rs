//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{Email, Role, UserId};

/// A stored account row.
///
/// Accounts come from local registration (password hash set) or first
/// federated login (external uid set); an account may hold both.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique display handle.
    pub username: String,
    /// User's email address.
    pub email: Email,
    /// Argon2id PHC string; `None` for federated-only accounts.
    pub password_hash: Option<String>,
    /// Identity provider uid; `None` for local-only accounts.
    pub external_uid: Option<String>,
    /// Authorization role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// Last successful login, if any.
    pub last_login_at: Option<DateTime<Utc>>,
}

/// The resolved principal attached to a request.
///
/// Built by the auth resolver middleware and read by the role extractors.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: Role,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Sparse changes to an account; absent fields stay untouched.
///
/// The admin surface deserializes this directly; the self-service profile
/// route builds it from its own body type so `role` is never reachable
/// there.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl AccountChanges {
    /// True when the changeset touches nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.role.is_none()
    }
}

/// Account shape returned by the API (never includes credentials).
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: UserId::new(7),
            username: "greta".to_string(),
            email: "greta@example.com".parse().unwrap(),
            password_hash: Some("$argon2id$...".to_string()),
            external_uid: None,
            role: Role::Editor,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_user_view_omits_credentials() {
        let view = UserView::from(sample_user());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["username"], "greta");
        assert_eq!(json["role"], "editor");
        assert!(json.get("password_hash").is_none());
        assert!(json.get("external_uid").is_none());
    }

    #[test]
    fn test_current_user_carries_role() {
        let user = sample_user();
        let current = CurrentUser::from(&user);
        assert_eq!(current.id, user.id);
        assert!(current.role.can_edit());
        assert!(!current.role.is_admin());
    }
}
