//! Blog post repository for database operations.
//!
//! Owns the two transactional invariants of the blog: the featured swap
//! (at most one featured row) and category-membership reconciliation.

use std::collections::HashSet;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use verdant_core::{CategoryId, PostId, UserId};

use super::{RepositoryError, escape_like};
use crate::models::{Category, NewPost, Post, PostChanges, PostSort};

const POST_COLUMNS: &str = "id, title, slug, content, excerpt, featured_image, author_id, \
     published, featured, published_at, created_at, updated_at";

/// Filter set for post listings; built by the content service.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// 1-based page number (validated by the caller).
    pub page: u32,
    /// Page size (validated by the caller).
    pub limit: u32,
    /// Restrict to these posts (category membership, resolved by the
    /// caller); `None` means unrestricted.
    pub post_ids: Option<Vec<PostId>>,
    /// Publish-state filter; `None` means all.
    pub published: Option<bool>,
    /// Substring search over title, content and excerpt.
    pub search: Option<String>,
    /// Sort order.
    pub sort: PostSort,
}

/// Membership row used for batch category enrichment.
#[derive(sqlx::FromRow)]
struct PostCategoryRow {
    post_id: PostId,
    id: CategoryId,
    name: String,
    slug: String,
}

/// Repository for blog post database operations.
pub struct PostRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PostRepository<'a> {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List a page of posts and the total match count.
    ///
    /// The count runs the identical predicate independently of the page
    /// query.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, query: &PostQuery) -> Result<(Vec<Post>, i64), RepositoryError> {
        let mut select =
            QueryBuilder::<Sqlite>::new(format!("SELECT {POST_COLUMNS} FROM blog_posts"));
        push_filters(&mut select, query);
        select.push(match query.sort {
            PostSort::Newest => " ORDER BY COALESCE(published_at, created_at) DESC, id DESC",
            PostSort::Oldest => " ORDER BY COALESCE(published_at, created_at) ASC, id ASC",
        });
        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.limit);
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(offset);

        let posts = select.build_query_as::<Post>().fetch_all(self.pool).await?;

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM blog_posts");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        Ok((posts, total))
    }

    /// Get a post by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: PostId) -> Result<Option<Post>, RepositoryError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(post)
    }

    /// Get a post by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, RepositoryError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(post)
    }

    /// Get the currently featured post, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_featured(&self) -> Result<Option<Post>, RepositoryError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE featured = 1 ORDER BY id DESC LIMIT 1"
        ))
        .fetch_optional(self.pool)
        .await?;
        Ok(post)
    }

    /// Create a post and its category memberships in one transaction.
    ///
    /// The slug has been resolved by the caller; `published_at` is stamped
    /// when the post is created already published.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        new: &NewPost,
        slug: &str,
        author_id: UserId,
    ) -> Result<Post, RepositoryError> {
        let now = Utc::now();
        let published_at = new.published.then_some(now);

        let mut tx = self.pool.begin().await?;

        let post = sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO blog_posts \
             (title, slug, content, excerpt, featured_image, author_id, published, published_at, \
              created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(new.title.clone())
        .bind(slug)
        .bind(new.content.clone())
        .bind(new.excerpt.clone())
        .bind(new.featured_image.clone())
        .bind(author_id)
        .bind(new.published)
        .bind(published_at)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("slug already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        for category_id in &new.category_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO blog_post_categories (post_id, category_id) VALUES (?, ?)",
            )
            .bind(post.id)
            .bind(*category_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(post)
    }

    /// Apply sparse changes and reconcile category memberships in one
    /// transaction.
    ///
    /// Setting `published = true` stamps `published_at` if it was never
    /// set; unpublishing keeps the historical timestamp. A present
    /// `category_ids` replaces the membership set by diffing against the
    /// stored one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post doesn't exist.
    /// Returns `RepositoryError::Conflict` if a new slug is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, id: PostId, changes: &PostChanges) -> Result<(), RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE blog_posts SET ");
        let mut assignments = builder.separated(", ");
        if let Some(title) = &changes.title {
            assignments
                .push("title = ")
                .push_bind_unseparated(title.clone());
        }
        if let Some(slug) = &changes.slug {
            assignments
                .push("slug = ")
                .push_bind_unseparated(slug.clone());
        }
        if let Some(content) = &changes.content {
            assignments
                .push("content = ")
                .push_bind_unseparated(content.clone());
        }
        if let Some(excerpt) = &changes.excerpt {
            assignments
                .push("excerpt = ")
                .push_bind_unseparated(excerpt.clone());
        }
        if let Some(featured_image) = changes.featured_image.clone() {
            assignments
                .push("featured_image = ")
                .push_bind_unseparated(featured_image);
        }
        if let Some(published) = changes.published {
            assignments
                .push("published = ")
                .push_bind_unseparated(published);
            if published {
                assignments
                    .push("published_at = COALESCE(published_at, ")
                    .push_bind_unseparated(now)
                    .push_unseparated(")");
            }
        }
        assignments
            .push("updated_at = ")
            .push_bind_unseparated(now);
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&mut *tx).await.map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("slug already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        if let Some(desired) = &changes.category_ids {
            let stored: Vec<CategoryId> =
                sqlx::query_scalar("SELECT category_id FROM blog_post_categories WHERE post_id = ?")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;
            let stored: HashSet<CategoryId> = stored.into_iter().collect();
            let desired: HashSet<CategoryId> = desired.iter().copied().collect();

            let removed: Vec<CategoryId> = stored.difference(&desired).copied().collect();
            if !removed.is_empty() {
                let mut delete = QueryBuilder::<Sqlite>::new(
                    "DELETE FROM blog_post_categories WHERE post_id = ",
                );
                delete.push_bind(id).push(" AND category_id IN (");
                let mut values = delete.separated(", ");
                for category_id in removed {
                    values.push_bind(category_id);
                }
                values.push_unseparated(")");
                delete.build().execute(&mut *tx).await?;
            }

            for category_id in desired.difference(&stored) {
                sqlx::query(
                    "INSERT OR IGNORE INTO blog_post_categories (post_id, category_id) \
                     VALUES (?, ?)",
                )
                .bind(id)
                .bind(*category_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Make exactly one post the featured one.
    ///
    /// The target is set first so a missing post aborts before the previous
    /// holder is cleared; both steps commit together.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post doesn't exist (no
    /// state changes in that case).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_featured(&self, id: PostId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE blog_posts SET featured = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query("UPDATE blog_posts SET featured = 0 WHERE featured = 1 AND id != ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Delete a post; memberships cascade.
    ///
    /// # Returns
    ///
    /// Returns `true` if the post was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: PostId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM blog_posts WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// IDs of posts belonging to a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn post_ids_in_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<PostId>, RepositoryError> {
        let ids = sqlx::query_scalar(
            "SELECT post_id FROM blog_post_categories WHERE category_id = ?",
        )
        .bind(category_id)
        .fetch_all(self.pool)
        .await?;
        Ok(ids)
    }

    /// Categories of a single post, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_for_post(
        &self,
        id: PostId,
    ) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT c.id, c.name, c.slug FROM blog_post_categories m \
             JOIN categories c ON c.id = m.category_id \
             WHERE m.post_id = ? ORDER BY c.name ASC",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(categories)
    }

    /// Categories of many posts at once, for list enrichment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories_for_posts(
        &self,
        ids: &[PostId],
    ) -> Result<Vec<(PostId, Category)>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT m.post_id, c.id, c.name, c.slug FROM blog_post_categories m \
             JOIN categories c ON c.id = m.category_id WHERE m.post_id IN (",
        );
        let mut values = builder.separated(", ");
        for id in ids {
            values.push_bind(*id);
        }
        values.push_unseparated(") ORDER BY c.name ASC");

        let rows = builder
            .build_query_as::<PostCategoryRow>()
            .fetch_all(self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.post_id,
                    Category {
                        id: row.id,
                        name: row.name,
                        slug: row.slug,
                    },
                )
            })
            .collect())
    }

    /// Add a single membership; adding an existing pair is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_category(
        &self,
        id: PostId,
        category_id: CategoryId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT OR IGNORE INTO blog_post_categories (post_id, category_id) VALUES (?, ?)",
        )
        .bind(id)
        .bind(category_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Remove an exact membership pair.
    ///
    /// # Returns
    ///
    /// Returns `true` if the pair existed, `false` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_category(
        &self,
        id: PostId,
        category_id: CategoryId,
    ) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM blog_post_categories WHERE post_id = ? AND category_id = ?")
                .bind(id)
                .bind(category_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Published posts sharing at least one category with the given post,
    /// ranked by shared-category count, then recency.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related_by_shared_categories(
        &self,
        id: PostId,
        limit: i64,
    ) -> Result<Vec<Post>, RepositoryError> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT p.id, p.title, p.slug, p.content, p.excerpt, p.featured_image, p.author_id, \
                    p.published, p.featured, p.published_at, p.created_at, p.updated_at, \
                    COUNT(m.category_id) AS shared_count \
             FROM blog_posts p \
             JOIN blog_post_categories m ON m.post_id = p.id \
             WHERE m.category_id IN \
                   (SELECT category_id FROM blog_post_categories WHERE post_id = ?) \
               AND p.id != ? AND p.published = 1 \
             GROUP BY p.id \
             ORDER BY shared_count DESC, COALESCE(p.published_at, p.created_at) DESC \
             LIMIT ?",
        )
        .bind(id)
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(posts)
    }

    /// Most recent published posts, excluding one post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_published_excluding(
        &self,
        exclude: PostId,
        limit: i64,
    ) -> Result<Vec<Post>, RepositoryError> {
        let posts = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts WHERE published = 1 AND id != ? \
             ORDER BY COALESCE(published_at, created_at) DESC, id DESC LIMIT ?"
        ))
        .bind(exclude)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(posts)
    }
}

/// Append the WHERE clause for a [`PostQuery`].
///
/// Shared between the page query and the count query; any drift between the
/// two would break the `total` invariant.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &PostQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(ids) = &query.post_ids {
        if ids.is_empty() {
            // Callers short-circuit this case; keep the SQL valid anyway.
            builder.push(" AND 0 = 1");
        } else {
            builder.push(" AND id IN (");
            let mut values = builder.separated(", ");
            for id in ids {
                values.push_bind(*id);
            }
            values.push_unseparated(")");
        }
    }

    if let Some(published) = query.published {
        builder.push(" AND published = ").push_bind(published);
    }

    if let Some(term) = &query.search {
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR content LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR excerpt LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}
