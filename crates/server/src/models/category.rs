//! Category domain types.

use serde::{Deserialize, Serialize};

use verdant_core::CategoryId;

/// A taxonomy entry, shared by products and blog posts.
///
/// The row shape doubles as the API shape; there is nothing to enrich.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// URL-safe identifier derived from the name.
    pub slug: String,
}

/// Payload for creating a category.
///
/// The slug is derived from the name when not supplied explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Sparse changes to a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl CategoryChanges {
    /// True when no field is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none()
    }
}
