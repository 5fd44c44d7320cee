//! Product repository for database operations.
//!
//! Listing uses a single filter builder shared by the page query and the
//! count query so `total` always reflects the same predicate as the page.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use verdant_core::{CategoryId, IngredientList, ProductId};

use super::{RepositoryError, escape_like};
use crate::models::{FeatureChanges, NewProduct, Product, ProductChanges, ProductSort};

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category_id, image, \
     organic, vegan, gluten_free, lactose_free, sugar_free, nut_free, soy_free, fair_trade, \
     recommendation, ingredients, affiliate_url, created_at, updated_at";

/// Filter set for product listings; built by the catalog service.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    /// 1-based page number (validated by the caller).
    pub page: u32,
    /// Page size (validated by the caller).
    pub per_page: u32,
    /// Category filter, OR semantics; empty means unfiltered.
    pub category_ids: Vec<CategoryId>,
    /// Per-flag requirements; only `Some(true)` constrains.
    pub flags: FeatureChanges,
    /// Inclusive lower price bound, in cents.
    pub min_cents: Option<i64>,
    /// Inclusive upper price bound, in cents.
    pub max_cents: Option<i64>,
    /// Substring search over name and description.
    pub search: Option<String>,
    /// Sort order.
    pub sort: ProductSort,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List a page of products and the total match count.
    ///
    /// The count runs the identical predicate independently of the page
    /// query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, query: &ProductQuery) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut select, query);
        select.push(match query.sort {
            ProductSort::PriceAsc => " ORDER BY price_cents ASC, id ASC",
            ProductSort::PriceDesc => " ORDER BY price_cents DESC, id ASC",
            ProductSort::Newest => " ORDER BY created_at DESC, id DESC",
        });
        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.per_page);
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.per_page))
            .push(" OFFSET ")
            .push_bind(offset);

        let products = select
            .build_query_as::<Product>()
            .fetch_all(self.pool)
            .await?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((products, total))
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// Most recent products in a category, excluding one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_in_category(
        &self,
        category_id: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE category_id = ? AND id != ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(category_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Most recent products outside a category (or uncategorized),
    /// excluding one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_outside_category(
        &self,
        category_id: CategoryId,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE (category_id IS NULL OR category_id != ?) AND id != ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(category_id)
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Most recent products overall, excluding one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_excluding(
        &self,
        exclude: ProductId,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id != ? \
             ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Create a product.
    ///
    /// The repository owns the stored representations: price in cents,
    /// ingredients as a normalized JSON string array.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let now = Utc::now();
        let ingredients = IngredientList::new(new.ingredients.as_slice().to_vec()).to_json();
        let flags = new.features.entries();

        let mut builder = QueryBuilder::<Sqlite>::new(
            "INSERT INTO products (name, description, price_cents, category_id, image, ",
        );
        let mut columns = builder.separated(", ");
        for (column, _) in flags {
            columns.push(column);
        }
        builder.push(", recommendation, ingredients, affiliate_url, created_at, updated_at) VALUES (");
        let mut values = builder.separated(", ");
        values
            .push_bind(new.name.clone())
            .push_bind(new.description.clone())
            .push_bind(new.price.cents())
            .push_bind(new.category_id)
            .push_bind(new.image.clone());
        for (_, value) in flags {
            values.push_bind(value);
        }
        values
            .push_bind(new.recommendation.clone())
            .push_bind(ingredients)
            .push_bind(new.affiliate_url.clone())
            .push_bind(now)
            .push_bind(now);
        builder.push(&format!(") RETURNING {PRODUCT_COLUMNS}"));

        let product = builder
            .build_query_as::<Product>()
            .fetch_one(self.pool)
            .await?;
        Ok(product)
    }

    /// Apply the canonical partial-update changeset.
    ///
    /// Present fields overwrite, absent fields persist; `updated_at` is
    /// always refreshed. Callers re-read for the enriched result.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        changes: &ProductChanges,
    ) -> Result<(), RepositoryError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE products SET ");
        let mut assignments = builder.separated(", ");

        if let Some(name) = &changes.name {
            assignments
                .push("name = ")
                .push_bind_unseparated(name.clone());
        }
        if let Some(description) = &changes.description {
            assignments
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(price) = changes.price {
            assignments
                .push("price_cents = ")
                .push_bind_unseparated(price.cents());
        }
        if let Some(category_id) = changes.category_id {
            assignments
                .push("category_id = ")
                .push_bind_unseparated(category_id);
        }
        if let Some(image) = &changes.image {
            assignments
                .push("image = ")
                .push_bind_unseparated(image.clone());
        }
        for (column, value) in changes.features.entries() {
            if let Some(value) = value {
                assignments
                    .push(column)
                    .push_unseparated(" = ")
                    .push_bind_unseparated(value);
            }
        }
        if let Some(recommendation) = &changes.recommendation {
            assignments
                .push("recommendation = ")
                .push_bind_unseparated(recommendation.clone());
        }
        if let Some(ingredients) = &changes.ingredients {
            let normalized = IngredientList::new(ingredients.as_slice().to_vec()).to_json();
            assignments
                .push("ingredients = ")
                .push_bind_unseparated(normalized);
        }
        if let Some(affiliate_url) = &changes.affiliate_url {
            assignments
                .push("affiliate_url = ")
                .push_bind_unseparated(affiliate_url.clone());
        }
        assignments
            .push("updated_at = ")
            .push_bind_unseparated(Utc::now());

        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product and its vendor offers in one transaction.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM vendors WHERE product_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Append the WHERE clause for a [`ProductQuery`].
///
/// Shared between the page query and the count query; any drift between the
/// two would break the `total` invariant.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ProductQuery) {
    builder.push(" WHERE 1 = 1");

    if !query.category_ids.is_empty() {
        builder.push(" AND category_id IN (");
        let mut values = builder.separated(", ");
        for id in &query.category_ids {
            values.push_bind(*id);
        }
        values.push_unseparated(")");
    }

    for (column, value) in query.flags.entries() {
        if value == Some(true) {
            builder.push(" AND ").push(column).push(" = 1");
        }
    }

    if let Some(min) = query.min_cents {
        builder.push(" AND price_cents >= ").push_bind(min);
    }
    if let Some(max) = query.max_cents {
        builder.push(" AND price_cents <= ").push_bind(max);
    }

    if let Some(term) = &query.search {
        // SQLite LIKE is case-insensitive for ASCII, which is the contract
        // for search here.
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR description LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}
