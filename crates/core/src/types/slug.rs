//! URL slug type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum SlugError {
    /// The input is empty, or nothing slug-worthy remains after cleanup.
    #[error("slug cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("slug must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[a-z0-9-]`.
    #[error("slug contains invalid character {found:?}")]
    InvalidCharacter {
        /// The offending character.
        found: char,
    },
    /// The input starts or ends with a hyphen.
    #[error("slug cannot start or end with a hyphen")]
    HyphenAtEdge,
}

/// A URL-safe identifier: lowercase alphanumerics separated by hyphens.
///
/// ```
/// use verdant_core::Slug;
///
/// let slug = Slug::from_title("Fair Trade Coffee, Whole Bean").unwrap();
/// assert_eq!(slug.as_str(), "fair-trade-coffee-whole-bean");
///
/// assert!(Slug::parse("fair-trade-coffee").is_ok());
/// assert!(Slug::parse("Fair Trade").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Maximum length of a slug.
    pub const MAX_LENGTH: usize = 160;

    /// Parse a `Slug` from a string, accepting only `[a-z0-9-]` with no
    /// hyphen at either edge.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, contains a
    /// character outside the slug alphabet, or has a hyphen at an edge.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if let Some(found) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SlugError::InvalidCharacter { found });
        }

        if s.starts_with('-') || s.ends_with('-') {
            return Err(SlugError::HyphenAtEdge);
        }

        Ok(Self(s.to_owned()))
    }

    /// Derive a `Slug` from free text: lowercased alphanumeric runs joined
    /// by single hyphens, everything else dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] if no alphanumeric characters remain,
    /// or [`SlugError::TooLong`] if the result exceeds [`Self::MAX_LENGTH`].
    pub fn from_title(title: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(title.len());
        for c in title.chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
            } else if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
        }

        while out.ends_with('-') {
            out.pop();
        }

        Self::parse(&out)
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Slug {
    type Err = SlugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
