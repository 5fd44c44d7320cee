//! What authentication keeps in the session store.

use serde::{Deserialize, Serialize};

use verdant_core::{Email, UserId};

/// The logged-in identity persisted across requests.
///
/// Deliberately small: just enough to find the account again. Role and
/// profile fields are re-read from the database on every request, so a
/// role change takes effect without re-login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Email,
}

/// Well-known session record keys.
pub mod keys {
    /// Holds the [`SessionUser`](super::SessionUser) for the signed-in account.
    pub const CURRENT_USER: &str = "current_user";
}
