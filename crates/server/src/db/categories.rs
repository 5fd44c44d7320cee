//! Category repository for database operations.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use verdant_core::CategoryId;

use super::RepositoryError;
use crate::models::Category;

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug FROM categories ORDER BY name ASC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Get a category by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let category =
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(category)
    }

    /// Resolve a set of slugs to categories; unknown slugs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slugs(&self, slugs: &[String]) -> Result<Vec<Category>, RepositoryError> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT id, name, slug FROM categories WHERE slug IN (");
        let mut values = builder.separated(", ");
        for slug in slugs {
            values.push_bind(slug.clone());
        }
        values.push_unseparated(")");

        let categories = builder
            .build_query_as::<Category>()
            .fetch_all(self.pool)
            .await?;
        Ok(categories)
    }

    /// Fetch categories by ID, preserving no particular order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_ids(&self, ids: &[CategoryId]) -> Result<Vec<Category>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT id, name, slug FROM categories WHERE id IN (");
        let mut values = builder.separated(", ");
        for id in ids {
            values.push_bind(*id);
        }
        values.push_unseparated(")");

        let categories = builder
            .build_query_as::<Category>()
            .fetch_all(self.pool)
            .await?;
        Ok(categories)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name or slug already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, name: &str, slug: &str) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES (?, ?) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("category name or slug already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;
        Ok(category)
    }

    /// Apply sparse changes; absent fields stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category doesn't exist.
    /// Returns `RepositoryError::Conflict` if the name or slug is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: CategoryId,
        name: Option<&str>,
        slug: Option<&str>,
    ) -> Result<(), RepositoryError> {
        if name.is_none() && slug.is_none() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE categories SET ");
        let mut assignments = builder.separated(", ");
        if let Some(name) = name {
            assignments
                .push("name = ")
                .push_bind_unseparated(name.to_owned());
        }
        if let Some(slug) = slug {
            assignments
                .push("slug = ")
                .push_bind_unseparated(slug.to_owned());
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(self.pool).await.map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("category name or slug already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a category.
    ///
    /// Foreign-key actions null out product references and remove blog-post
    /// memberships in the same implicit transaction; content is never
    /// cascaded away.
    ///
    /// # Returns
    ///
    /// Returns `true` if the category was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CategoryId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
