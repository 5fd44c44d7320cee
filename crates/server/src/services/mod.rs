//! Business logic services.
//!
//! Services sit between the route handlers and the repositories: they
//! validate input, enforce the cross-entity rules (category resolution,
//! related-item selection, membership reconciliation), and assemble the
//! enriched views the API returns. Handlers stay thin; repositories stay
//! dumb.
//!
//! # Services
//!
//! - `auth` - Registration, password login, federated provisioning
//! - `catalog` - Products, categories, and vendor offers
//! - `content` - Blog posts, featured designation, category memberships

pub mod auth;
pub mod catalog;
pub mod content;

pub use auth::AuthService;
pub use catalog::CatalogService;
pub use content::ContentService;

use verdant_core::Slug;

use crate::error::{AppError, Result};

/// Use the explicit slug when one was supplied, otherwise derive one from
/// the given text (a product name or post title).
pub(crate) fn resolve_slug(explicit: Option<&str>, fallback: &str) -> Result<Slug> {
    match explicit {
        Some(raw) => Slug::parse(raw),
        None => Slug::from_title(fallback),
    }
    .map_err(|e| AppError::Validation(format!("slug: {e}")))
}

/// Trim a search term; an all-whitespace term means "no search".
pub(crate) fn normalize_search(search: Option<String>) -> Option<String> {
    search
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_slug_prefers_explicit() {
        let slug = resolve_slug(Some("fair-trade"), "Something Else").unwrap();
        assert_eq!(slug.as_str(), "fair-trade");
    }

    #[test]
    fn test_resolve_slug_derives_from_text() {
        let slug = resolve_slug(None, "Harvest Notes, 2025!").unwrap();
        assert_eq!(slug.as_str(), "harvest-notes-2025");
    }

    #[test]
    fn test_resolve_slug_rejects_bad_explicit() {
        let err = resolve_slug(Some("Not A Slug"), "fallback").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("slug:")));
    }

    #[test]
    fn test_normalize_search_drops_blank_terms() {
        assert_eq!(
            normalize_search(Some("  oat  ".to_string())),
            Some("oat".to_string())
        );
        assert_eq!(normalize_search(Some("   ".to_string())), None);
        assert_eq!(normalize_search(None), None);
    }
}
