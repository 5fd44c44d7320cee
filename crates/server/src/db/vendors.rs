//! Vendor repository for database operations.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use verdant_core::{ProductId, VendorId};

use super::RepositoryError;
use crate::models::{NewVendor, Vendor, VendorChanges};

const VENDOR_COLUMNS: &str = "id, product_id, name, url, price_cents";

/// Repository for vendor database operations.
pub struct VendorRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VendorRepository<'a> {
    /// Create a new vendor repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List offers for a product, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Vendor>, RepositoryError> {
        let vendors = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE product_id = ? \
             ORDER BY price_cents ASC, id ASC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(vendors)
    }

    /// Get an offer by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(vendor)
    }

    /// Create an offer. The owning product must exist (callers check).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, new: &NewVendor) -> Result<Vendor, RepositoryError> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            "INSERT INTO vendors (product_id, name, url, price_cents) \
             VALUES (?, ?, ?, ?) RETURNING {VENDOR_COLUMNS}"
        ))
        .bind(new.product_id)
        .bind(new.name.clone())
        .bind(new.url.clone())
        .bind(new.price.cents())
        .fetch_one(self.pool)
        .await?;
        Ok(vendor)
    }

    /// Apply sparse changes; absent fields stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the offer doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: VendorId, changes: &VendorChanges) -> Result<(), RepositoryError> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE vendors SET ");
        let mut assignments = builder.separated(", ");
        if let Some(name) = &changes.name {
            assignments
                .push("name = ")
                .push_bind_unseparated(name.clone());
        }
        if let Some(url) = &changes.url {
            assignments
                .push("url = ")
                .push_bind_unseparated(url.clone());
        }
        if let Some(price) = changes.price {
            assignments
                .push("price_cents = ")
                .push_bind_unseparated(price.cents());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete an offer.
    ///
    /// # Returns
    ///
    /// Returns `true` if the offer was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: VendorId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM vendors WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
