//! Catalog service: products and their vendor offers.
//!
//! Owns listing validation, category-slug resolution, related-product
//! selection, and the rule that every mutation answers with the re-read,
//! enriched product.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::SqlitePool;

use verdant_core::{CategoryId, Price, ProductId, Slug, VendorId};

use crate::db::products::ProductQuery;
use crate::db::{CategoryRepository, ProductRepository, RepositoryError, VendorRepository};
use crate::error::{AppError, Result};
use crate::models::{
    Category, CategoryChanges, FeatureChanges, NewCategory, NewProduct, NewVendor, Product,
    ProductChanges, ProductFeatures, ProductSort, ProductView, VendorChanges, VendorView,
};
use crate::services::{normalize_search, resolve_slug};

/// How many related products to return.
const RELATED_COUNT: i64 = 4;

/// Upper bound for the page size.
const MAX_PER_PAGE: u32 = 100;

/// Page size when the query doesn't specify one.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Listing input as assembled by the products route.
#[derive(Debug, Clone)]
pub struct ProductListParams {
    pub page: u32,
    pub per_page: u32,
    /// Category slugs, OR semantics; unknown slugs match nothing.
    pub category_slugs: Vec<String>,
    /// Per-flag requirements; only `Some(true)` constrains.
    pub flags: FeatureChanges,
    /// Inclusive price bounds as decimal amounts.
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

/// One page of enriched products plus the total match count.
#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<ProductView>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
    vendors: VendorRepository<'a>,
}

impl<'a> CatalogService<'a> {
    /// Create a new catalog service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
            vendors: VendorRepository::new(pool),
        }
    }

    /// List products with filters, pagination and enrichment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for out-of-range paging or malformed
    /// price bounds, `AppError::Database` if a query fails.
    pub async fn list(&self, params: ProductListParams) -> Result<ProductPage> {
        validate_paging(params.page, params.per_page)?;
        let min_cents = parse_price_bound(params.min_price, "min_price")?;
        let max_cents = parse_price_bound(params.max_price, "max_price")?;
        let search = normalize_search(params.search);

        let category_ids = if params.category_slugs.is_empty() {
            Vec::new()
        } else {
            let matched = self.categories.get_by_slugs(&params.category_slugs).await?;
            if matched.is_empty() {
                // Slugs that resolve to no category must match nothing, not
                // fall through to an unfiltered listing.
                return Ok(ProductPage {
                    products: Vec::new(),
                    total: 0,
                    page: params.page,
                    per_page: params.per_page,
                });
            }
            matched.into_iter().map(|category| category.id).collect()
        };

        let query = ProductQuery {
            page: params.page,
            per_page: params.per_page,
            category_ids,
            flags: params.flags,
            min_cents,
            max_cents,
            search,
            sort: params.sort,
        };

        let (rows, total) = self.products.list(&query).await?;
        let products = self.enrich_all(rows).await?;

        Ok(ProductPage {
            products,
            total,
            page: params.page,
            per_page: params.per_page,
        })
    }

    /// Retrieve one product, enriched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist.
    pub async fn get(&self, id: ProductId) -> Result<ProductView> {
        let product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or_else(product_not_found)?;
        self.enrich_one(product).await
    }

    /// Related products: same category first, backfilled with recent
    /// products from elsewhere; never the product itself, no duplicates.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist.
    pub async fn related(&self, id: ProductId) -> Result<Vec<ProductView>> {
        let product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or_else(product_not_found)?;

        let rows = match product.category_id {
            Some(category_id) => {
                let mut rows = self
                    .products
                    .recent_in_category(category_id, id, RELATED_COUNT)
                    .await?;
                let got = i64::try_from(rows.len()).unwrap_or(i64::MAX);
                if got < RELATED_COUNT {
                    let backfill = self
                        .products
                        .recent_outside_category(category_id, id, RELATED_COUNT - got)
                        .await?;
                    rows.extend(backfill);
                }
                rows
            }
            None => self.products.recent_excluding(id, RELATED_COUNT).await?,
        };

        self.enrich_all(rows).await
    }

    /// Create a product and return it enriched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty name, `AppError::NotFound`
    /// if the referenced category doesn't exist.
    pub async fn create(&self, new: NewProduct) -> Result<ProductView> {
        if new.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        if let Some(category_id) = new.category_id {
            self.require_category(category_id).await?;
        }

        let product = self.products.create(&new).await?;
        self.enrich_one(product).await
    }

    /// Apply the canonical partial update and return the re-read product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty changeset or name,
    /// `AppError::NotFound` if the product or a referenced category doesn't
    /// exist.
    pub async fn update(&self, id: ProductId, changes: ProductChanges) -> Result<ProductView> {
        if changes.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }
        if let Some(name) = &changes.name
            && name.trim().is_empty()
        {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        if let Some(Some(category_id)) = changes.category_id {
            self.require_category(category_id).await?;
        }

        match self.products.update(id, &changes).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(product_not_found()),
            Err(other) => return Err(other.into()),
        }

        self.get(id).await
    }

    /// Overwrite all eight feature flags.
    ///
    /// A full-set surface over the canonical update path: flags omitted in
    /// the payload have already been coerced to false by deserialization.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist.
    pub async fn overwrite_features(
        &self,
        id: ProductId,
        features: ProductFeatures,
    ) -> Result<ProductView> {
        let changes = ProductChanges {
            features: features.into_changes(),
            ..ProductChanges::default()
        };
        self.update(id, changes).await
    }

    /// Delete a product (vendor offers go with it).
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist.
    pub async fn delete(&self, id: ProductId) -> Result<()> {
        if self.products.delete(id).await? {
            Ok(())
        } else {
            Err(product_not_found())
        }
    }

    /// Vendor offers for a product, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product doesn't exist.
    pub async fn vendors_for(&self, product_id: ProductId) -> Result<Vec<VendorView>> {
        self.require_product(product_id).await?;
        let vendors = self.vendors.list_for_product(product_id).await?;
        Ok(vendors.into_iter().map(VendorView::from).collect())
    }

    /// Create a vendor offer for an existing product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty name, `AppError::NotFound`
    /// if the product doesn't exist.
    pub async fn add_vendor(&self, new: NewVendor) -> Result<VendorView> {
        if new.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        self.require_product(new.product_id).await?;

        let vendor = self.vendors.create(&new).await?;
        Ok(vendor.into())
    }

    /// Apply sparse changes to a vendor offer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty changeset,
    /// `AppError::NotFound` if the offer doesn't exist.
    pub async fn update_vendor(&self, id: VendorId, changes: VendorChanges) -> Result<VendorView> {
        if changes.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }

        match self.vendors.update(id, &changes).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(vendor_not_found()),
            Err(other) => return Err(other.into()),
        }

        let vendor = self
            .vendors
            .get_by_id(id)
            .await?
            .ok_or_else(vendor_not_found)?;
        Ok(vendor.into())
    }

    /// Delete a vendor offer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the offer doesn't exist.
    pub async fn delete_vendor(&self, id: VendorId) -> Result<()> {
        if self.vendors.delete(id).await? {
            Ok(())
        } else {
            Err(vendor_not_found())
        }
    }

    /// All categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.list().await?)
    }

    /// Create a category, deriving the slug from the name when not given.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty name or malformed slug,
    /// `AppError::Conflict` if the name or slug is taken.
    pub async fn create_category(&self, new: NewCategory) -> Result<Category> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        let slug = resolve_slug(new.slug.as_deref(), name)?;

        Ok(self.categories.create(name, slug.as_str()).await?)
    }

    /// Apply sparse changes to a category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty changeset, name or
    /// malformed slug, `AppError::NotFound` if the category doesn't exist,
    /// `AppError::Conflict` if the new name or slug is taken.
    pub async fn update_category(
        &self,
        id: CategoryId,
        changes: CategoryChanges,
    ) -> Result<Category> {
        if changes.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }
        let name = match &changes.name {
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation("name must not be empty".to_string()));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        let slug = changes
            .slug
            .as_deref()
            .map(|raw| {
                Slug::parse(raw).map_err(|e| AppError::Validation(format!("slug: {e}")))
            })
            .transpose()?;

        match self
            .categories
            .update(id, name.as_deref(), slug.as_ref().map(Slug::as_str))
            .await
        {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(category_not_found()),
            Err(other) => return Err(other.into()),
        }

        self.categories
            .get_by_id(id)
            .await?
            .ok_or_else(category_not_found)
    }

    /// Delete a category; products lose the reference, posts lose the
    /// membership, nothing else goes with it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the category doesn't exist.
    pub async fn delete_category(&self, id: CategoryId) -> Result<()> {
        if self.categories.delete(id).await? {
            Ok(())
        } else {
            Err(category_not_found())
        }
    }

    /// Resolve categories for a batch of rows with one query.
    async fn enrich_all(&self, products: Vec<Product>) -> Result<Vec<ProductView>> {
        let ids: Vec<CategoryId> = products
            .iter()
            .filter_map(|product| product.category_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let by_id: HashMap<CategoryId, Category> = self
            .categories
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|category| (category.id, category))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| {
                let category = product.category_id.and_then(|id| by_id.get(&id).cloned());
                ProductView::from_parts(product, category)
            })
            .collect())
    }

    async fn enrich_one(&self, product: Product) -> Result<ProductView> {
        let category = match product.category_id {
            Some(id) => self.categories.get_by_id(id).await?,
            None => None,
        };
        Ok(ProductView::from_parts(product, category))
    }

    async fn require_category(&self, id: CategoryId) -> Result<()> {
        self.categories
            .get_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(category_not_found)
    }

    async fn require_product(&self, id: ProductId) -> Result<()> {
        self.products
            .get_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(product_not_found)
    }
}

fn product_not_found() -> AppError {
    AppError::NotFound("Product".to_string())
}

fn vendor_not_found() -> AppError {
    AppError::NotFound("Vendor".to_string())
}

fn category_not_found() -> AppError {
    AppError::NotFound("Category".to_string())
}

/// Reject out-of-range paging before any query runs.
fn validate_paging(page: u32, per_page: u32) -> Result<()> {
    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if per_page < 1 || per_page > MAX_PER_PAGE {
        return Err(AppError::Validation(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    Ok(())
}

/// Convert a decimal price bound to cents, rejecting malformed amounts.
fn parse_price_bound(bound: Option<Decimal>, field: &str) -> Result<Option<i64>> {
    bound
        .map(|amount| {
            Price::parse(amount)
                .map(|price| price.cents())
                .map_err(|e| AppError::Validation(format!("{field}: {e}")))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn test_validate_paging_bounds() {
        assert!(validate_paging(1, 1).is_ok());
        assert!(validate_paging(1, 100).is_ok());
        assert!(validate_paging(0, 20).is_err());
        assert!(validate_paging(1, 0).is_err());
        assert!(validate_paging(1, 101).is_err());
    }

    #[test]
    fn test_parse_price_bound_converts_to_cents() {
        assert_eq!(
            parse_price_bound(Some(dec("19.99")), "min_price").unwrap(),
            Some(1999)
        );
        assert_eq!(parse_price_bound(None, "min_price").unwrap(), None);
    }

    #[test]
    fn test_parse_price_bound_rejects_negative() {
        let err = parse_price_bound(Some(dec("-1.00")), "max_price").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.starts_with("max_price")));
    }
}
