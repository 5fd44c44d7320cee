//! Product domain types: the stored row, changesets, and the enriched view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{CategoryId, IngredientList, Price, ProductId};

use super::Category;
use super::double_option;

/// The eight dietary/sourcing feature flags.
///
/// Deserialization defaults every omitted flag to `false`, which is exactly
/// the contract of the full-overwrite features endpoint; the general update
/// path goes through [`FeatureChanges`] instead so omission keeps the stored
/// value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct ProductFeatures {
    #[serde(default)]
    pub organic: bool,
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub gluten_free: bool,
    #[serde(default)]
    pub lactose_free: bool,
    #[serde(default)]
    pub sugar_free: bool,
    #[serde(default)]
    pub nut_free: bool,
    #[serde(default)]
    pub soy_free: bool,
    #[serde(default)]
    pub fair_trade: bool,
}

impl ProductFeatures {
    /// Column name / value pairs, in schema order.
    #[must_use]
    pub const fn entries(&self) -> [(&'static str, bool); 8] {
        [
            ("organic", self.organic),
            ("vegan", self.vegan),
            ("gluten_free", self.gluten_free),
            ("lactose_free", self.lactose_free),
            ("sugar_free", self.sugar_free),
            ("nut_free", self.nut_free),
            ("soy_free", self.soy_free),
            ("fair_trade", self.fair_trade),
        ]
    }

    /// Convert to a changeset that overwrites all eight flags.
    #[must_use]
    pub const fn into_changes(self) -> FeatureChanges {
        FeatureChanges {
            organic: Some(self.organic),
            vegan: Some(self.vegan),
            gluten_free: Some(self.gluten_free),
            lactose_free: Some(self.lactose_free),
            sugar_free: Some(self.sugar_free),
            nut_free: Some(self.nut_free),
            soy_free: Some(self.soy_free),
            fair_trade: Some(self.fair_trade),
        }
    }
}

/// Sparse feature-flag changes: `None` keeps the stored value.
///
/// Doubles as the flag filter for listing, where `Some(true)` requires the
/// flag and anything else leaves it unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct FeatureChanges {
    pub organic: Option<bool>,
    pub vegan: Option<bool>,
    pub gluten_free: Option<bool>,
    pub lactose_free: Option<bool>,
    pub sugar_free: Option<bool>,
    pub nut_free: Option<bool>,
    pub soy_free: Option<bool>,
    pub fair_trade: Option<bool>,
}

impl FeatureChanges {
    /// Column name / value pairs, in schema order.
    #[must_use]
    pub const fn entries(&self) -> [(&'static str, Option<bool>); 8] {
        [
            ("organic", self.organic),
            ("vegan", self.vegan),
            ("gluten_free", self.gluten_free),
            ("lactose_free", self.lactose_free),
            ("sugar_free", self.sugar_free),
            ("nut_free", self.nut_free),
            ("soy_free", self.soy_free),
            ("fair_trade", self.fair_trade),
        ]
    }

    /// True when no flag is touched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, value)| value.is_none())
    }
}

/// A stored product row.
///
/// `ingredients` is the raw stored text; every read path normalizes it via
/// [`IngredientList::parse`] before the value leaves the service layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub category_id: Option<CategoryId>,
    pub image: Option<String>,
    #[sqlx(flatten)]
    pub features: ProductFeatures,
    pub recommendation: String,
    pub ingredients: String,
    pub affiliate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product shape returned by the API: category resolved, price decimal,
/// ingredients normalized.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Price,
    pub category_id: Option<CategoryId>,
    pub category: Option<Category>,
    pub image: Option<String>,
    #[serde(flatten)]
    pub features: ProductFeatures,
    pub recommendation: String,
    pub ingredients: IngredientList,
    pub affiliate_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    /// Combine a row with its resolved category.
    #[must_use]
    pub fn from_parts(product: Product, category: Option<Category>) -> Self {
        Self {
            id: product.id,
            name: product.name,
            description: product.description,
            price: Price::from_cents(product.price_cents),
            category_id: product.category_id,
            category,
            image: product.image,
            features: product.features,
            recommendation: product.recommendation,
            ingredients: IngredientList::parse(&product.ingredients),
            affiliate_url: product.affiliate_url,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(flatten)]
    pub features: ProductFeatures,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub ingredients: IngredientList,
    #[serde(default)]
    pub affiliate_url: Option<String>,
}

/// The canonical partial-update changeset.
///
/// Scalar fields: absent keeps the stored value. Nullable fields use the
/// double-`Option` encoding (absent = keep, `null` = clear). Flags ride in
/// [`FeatureChanges`], flattened, so they share the omission rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Price>,
    #[serde(default, deserialize_with = "double_option")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
    #[serde(flatten)]
    pub features: FeatureChanges,
    pub recommendation: Option<String>,
    pub ingredients: Option<IngredientList>,
    #[serde(default, deserialize_with = "double_option")]
    pub affiliate_url: Option<Option<String>>,
}

impl ProductChanges {
    /// True when the changeset touches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.image.is_none()
            && self.features.is_empty()
            && self.recommendation.is_none()
            && self.ingredients.is_none()
            && self.affiliate_url.is_none()
    }
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_features_default_false_on_omission() {
        let features: ProductFeatures = serde_json::from_value(json!({ "organic": true })).unwrap();
        assert!(features.organic);
        assert!(!features.vegan);
        assert!(!features.fair_trade);
    }

    #[test]
    fn test_features_flatten_into_product_json() {
        let view = ProductView {
            id: ProductId::new(1),
            name: "Rolled Oats".to_string(),
            description: String::new(),
            price: Price::from_cents(399),
            category_id: None,
            category: None,
            image: None,
            features: ProductFeatures {
                organic: true,
                ..ProductFeatures::default()
            },
            recommendation: String::new(),
            ingredients: IngredientList::default(),
            affiliate_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["organic"], true);
        assert_eq!(json["vegan"], false);
        assert_eq!(json["price"], "3.99");
        assert!(json.get("features").is_none());
    }

    #[test]
    fn test_changes_distinguish_null_from_absent() {
        let changes: ProductChanges =
            serde_json::from_value(json!({ "category_id": null, "name": "Oats" })).unwrap();
        assert_eq!(changes.category_id, Some(None));
        assert_eq!(changes.name.as_deref(), Some("Oats"));
        assert!(changes.image.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_omitted_flags_stay_untouched_in_changes() {
        let changes: ProductChanges =
            serde_json::from_value(json!({ "vegan": true })).unwrap();
        assert_eq!(changes.features.vegan, Some(true));
        assert_eq!(changes.features.organic, None);
    }

    #[test]
    fn test_empty_changeset_detected() {
        let changes: ProductChanges = serde_json::from_value(json!({})).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn test_full_features_payload_overwrites_every_flag() {
        let features: ProductFeatures = serde_json::from_value(json!({ "vegan": true })).unwrap();
        let changes = features.into_changes();
        assert_eq!(changes.vegan, Some(true));
        assert_eq!(changes.organic, Some(false));
        assert!(changes.entries().iter().all(|(_, v)| v.is_some()));
    }

    #[test]
    fn test_product_sort_kebab_case() {
        let sort: ProductSort = serde_json::from_value(json!("price-asc")).unwrap();
        assert_eq!(sort, ProductSort::PriceAsc);
        assert_eq!(ProductSort::default(), ProductSort::Newest);
    }
}
