//! Ingredient lists and their storage normalization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A product's ingredient list.
///
/// The canonical stored form is a JSON string array ([`Self::to_json`]), but
/// historical rows can hold a doubly encoded array, bare comma-separated
/// text, or JSON null. [`Self::parse`] accepts all of those and always lands
/// on a clean list of strings.
///
/// Normalization is idempotent: parsing the canonical encoding of any parse
/// result yields the same list.
///
/// ```
/// use verdant_core::IngredientList;
///
/// let from_array = IngredientList::parse(r#"["oats","honey"]"#);
/// let from_double = IngredientList::parse(r#""[\"oats\",\"honey\"]""#);
/// let from_bare = IngredientList::parse("oats, honey");
///
/// assert_eq!(from_array, from_double);
/// assert_eq!(from_array, from_bare);
/// assert_eq!(IngredientList::parse(&from_array.to_json()), from_array);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct IngredientList(Vec<String>);

impl IngredientList {
    /// Build a list from items, trimming whitespace and dropping empties.
    #[must_use]
    pub fn new(items: Vec<String>) -> Self {
        Self(
            items
                .into_iter()
                .map(|item| item.trim().to_owned())
                .filter(|item| !item.is_empty())
                .collect(),
        )
    }

    /// Normalize a raw stored value into a list of strings.
    ///
    /// Accepted shapes, in order of preference:
    /// - a JSON array (strings kept, numbers stringified, the rest dropped)
    /// - a JSON string containing any accepted shape (double encoding)
    /// - JSON null (empty list)
    /// - bare comma-separated text
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Array(items)) => Self::new(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect(),
            ),
            // One quoting layer too many; unwrap it and try again.
            Ok(Value::String(inner)) => Self::parse(&inner),
            Ok(Value::Number(n)) => Self::new(vec![n.to_string()]),
            Ok(_) => Self::default(),
            Err(_) => Self::new(trimmed.split(',').map(str::to_owned).collect()),
        }
    }

    /// The canonical stored encoding: a JSON string array.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("[]"))
    }

    /// Returns the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consumes the list and returns its items.
    #[must_use]
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for IngredientList {
    fn from(items: Vec<String>) -> Self {
        Self::new(items)
    }
}
