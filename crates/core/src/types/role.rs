//! Account roles.

use serde::{Deserialize, Serialize};

/// Account role with escalating permission levels.
///
/// Stored as snake_case text in the database. An unrecognized stored value is
/// a decode error, never a silent downgrade to [`Role::User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular account: authenticated reads, self-service profile only.
    #[default]
    User,
    /// Manages the product catalog and blog content.
    Editor,
    /// Full access, including account management.
    Admin,
}

impl Role {
    /// Whether this role may manage catalog and blog content.
    #[must_use]
    pub const fn can_edit(self) -> bool {
        matches!(self, Self::Editor | Self::Admin)
    }

    /// Whether this role may manage accounts.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Editor => write!(f, "editor"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "editor" => Ok(Self::Editor),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_from_str_roundtrip() {
        for role in [Role::User, Role::Editor, Role::Admin] {
            let parsed: Role = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_permission_levels() {
        assert!(!Role::User.can_edit());
        assert!(Role::Editor.can_edit());
        assert!(Role::Admin.can_edit());

        assert!(!Role::User.is_admin());
        assert!(!Role::Editor.is_admin());
        assert!(Role::Admin.is_admin());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Editor).unwrap(), "\"editor\"");
        let parsed: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(parsed, Role::Admin);
    }
}
