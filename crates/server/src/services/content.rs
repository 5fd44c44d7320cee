//! Content service: blog posts, category memberships, the featured slot.
//!
//! Visibility is decided here by the caller-supplied publish filter; direct
//! retrieval by id or slug deliberately returns drafts so editors can
//! preview them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use sqlx::SqlitePool;

use verdant_core::{CategoryId, PostId, Slug, UserId};

use crate::db::posts::PostQuery;
use crate::db::{CategoryRepository, PostRepository, RepositoryError, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{Category, NewPost, Post, PostAuthor, PostChanges, PostSort, PostView};
use crate::services::{normalize_search, resolve_slug};

/// How many related posts to return.
const RELATED_COUNT: i64 = 3;

/// Upper bound for the page size.
const MAX_LIMIT: u32 = 100;

/// Page size when the query doesn't specify one.
pub const DEFAULT_LIMIT: u32 = 10;

/// Listing input as assembled by the blog routes.
#[derive(Debug, Clone)]
pub struct PostListParams {
    pub page: u32,
    pub limit: u32,
    /// Restrict to members of this category; a memberless category yields
    /// an empty page.
    pub category_id: Option<CategoryId>,
    /// Publish-state filter; the route derives it from the caller's role.
    pub published: Option<bool>,
    pub search: Option<String>,
    pub sort: PostSort,
}

/// One page of enriched posts plus the total match count.
#[derive(Debug, Serialize)]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// Content service.
pub struct ContentService<'a> {
    posts: PostRepository<'a>,
    categories: CategoryRepository<'a>,
    users: UserRepository<'a>,
}

impl<'a> ContentService<'a> {
    /// Create a new content service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            posts: PostRepository::new(pool),
            categories: CategoryRepository::new(pool),
            users: UserRepository::new(pool),
        }
    }

    /// List posts with filters, pagination and enrichment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for out-of-range paging,
    /// `AppError::Database` if a query fails.
    pub async fn list(&self, params: PostListParams) -> Result<PostPage> {
        validate_paging(params.page, params.limit)?;
        let search = normalize_search(params.search);

        let post_ids = match params.category_id {
            Some(category_id) => {
                let ids = self.posts.post_ids_in_category(category_id).await?;
                if ids.is_empty() {
                    // A category with no members matches nothing; don't fall
                    // through to an unfiltered listing.
                    return Ok(PostPage {
                        posts: Vec::new(),
                        total: 0,
                        page: params.page,
                        limit: params.limit,
                    });
                }
                Some(ids)
            }
            None => None,
        };

        let query = PostQuery {
            page: params.page,
            limit: params.limit,
            post_ids,
            published: params.published,
            search,
            sort: params.sort,
        };

        let (rows, total) = self.posts.list(&query).await?;
        let posts = self.enrich_all(rows).await?;

        Ok(PostPage {
            posts,
            total,
            page: params.page,
            limit: params.limit,
        })
    }

    /// Retrieve one post by id, enriched; drafts included.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post doesn't exist.
    pub async fn get(&self, id: PostId) -> Result<PostView> {
        let post = self.posts.get_by_id(id).await?.ok_or_else(post_not_found)?;
        self.enrich_one(post).await
    }

    /// Retrieve one post by slug, enriched; drafts included.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post doesn't exist.
    pub async fn get_by_slug(&self, slug: &str) -> Result<PostView> {
        let post = self
            .posts
            .get_by_slug(slug)
            .await?
            .ok_or_else(post_not_found)?;
        self.enrich_one(post).await
    }

    /// The post currently holding the featured slot.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` when nothing is featured.
    pub async fn featured(&self) -> Result<PostView> {
        let post = self
            .posts
            .get_featured()
            .await?
            .ok_or_else(|| AppError::NotFound("Featured post".to_string()))?;
        self.enrich_one(post).await
    }

    /// Related posts: shared-category ranking, falling back to the most
    /// recent published posts when nothing shares a category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post doesn't exist.
    pub async fn related(&self, id: PostId) -> Result<Vec<PostView>> {
        self.require_post(id).await?;

        let mut rows = self
            .posts
            .related_by_shared_categories(id, RELATED_COUNT)
            .await?;
        if rows.is_empty() {
            rows = self
                .posts
                .recent_published_excluding(id, RELATED_COUNT)
                .await?;
        }

        self.enrich_all(rows).await
    }

    /// Create a post authored by the calling editor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty title or malformed slug,
    /// `AppError::NotFound` if a referenced category doesn't exist,
    /// `AppError::Conflict` if the slug is taken.
    pub async fn create(&self, author_id: UserId, new: NewPost) -> Result<PostView> {
        if new.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        let slug = resolve_slug(new.slug.as_deref(), &new.title)?;
        self.require_categories(&new.category_ids).await?;

        let post = self.posts.create(&new, slug.as_str(), author_id).await?;
        self.enrich_one(post).await
    }

    /// Apply sparse changes, reconciling memberships when `category_ids`
    /// is present, and return the re-read post.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an empty changeset, title or
    /// malformed slug, `AppError::NotFound` if the post or a referenced
    /// category doesn't exist, `AppError::Conflict` if the new slug is
    /// taken.
    pub async fn update(&self, id: PostId, mut changes: PostChanges) -> Result<PostView> {
        if changes.is_empty() {
            return Err(AppError::Validation("no fields to update".to_string()));
        }
        if let Some(title) = &changes.title
            && title.trim().is_empty()
        {
            return Err(AppError::Validation("title must not be empty".to_string()));
        }
        if let Some(raw) = &changes.slug {
            let slug =
                Slug::parse(raw).map_err(|e| AppError::Validation(format!("slug: {e}")))?;
            changes.slug = Some(slug.into_inner());
        }
        if let Some(ids) = &changes.category_ids {
            self.require_categories(ids).await?;
        }

        match self.posts.update(id, &changes).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(post_not_found()),
            Err(other) => return Err(other.into()),
        }

        self.get(id).await
    }

    /// Hand the featured slot to this post, displacing the previous holder.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post doesn't exist; the previous
    /// holder keeps the slot in that case.
    pub async fn set_featured(&self, id: PostId) -> Result<PostView> {
        match self.posts.set_featured(id).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => return Err(post_not_found()),
            Err(other) => return Err(other.into()),
        }
        self.get(id).await
    }

    /// Delete a post; memberships go with it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post doesn't exist.
    pub async fn delete(&self, id: PostId) -> Result<()> {
        if self.posts.delete(id).await? {
            Ok(())
        } else {
            Err(post_not_found())
        }
    }

    /// Add one category membership; adding an existing pair is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post or category doesn't exist.
    pub async fn add_category(&self, id: PostId, category_id: CategoryId) -> Result<PostView> {
        self.require_post(id).await?;
        if self.categories.get_by_id(category_id).await?.is_none() {
            return Err(category_not_found());
        }

        self.posts.add_category(id, category_id).await?;
        self.get(id).await
    }

    /// Remove one exact membership pair.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the post doesn't exist or the pair
    /// wasn't a membership.
    pub async fn remove_category(&self, id: PostId, category_id: CategoryId) -> Result<PostView> {
        self.require_post(id).await?;
        if !self.posts.remove_category(id, category_id).await? {
            return Err(AppError::NotFound("Membership".to_string()));
        }

        self.get(id).await
    }

    /// Categories available for posts, alphabetically. The taxonomy is
    /// shared with the catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.list().await?)
    }

    /// Resolve authors and categories for a batch of rows with two queries.
    async fn enrich_all(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        let author_ids: Vec<UserId> = posts
            .iter()
            .filter_map(|post| post.author_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let authors: HashMap<UserId, PostAuthor> = self
            .users
            .get_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|user| {
                (
                    user.id,
                    PostAuthor {
                        id: user.id,
                        username: user.username,
                    },
                )
            })
            .collect();

        let post_ids: Vec<PostId> = posts.iter().map(|post| post.id).collect();
        let mut categories: HashMap<PostId, Vec<Category>> = HashMap::new();
        for (post_id, category) in self.posts.categories_for_posts(&post_ids).await? {
            categories.entry(post_id).or_default().push(category);
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let author = post.author_id.and_then(|id| authors.get(&id).cloned());
                let post_categories = categories.remove(&post.id).unwrap_or_default();
                PostView::from_parts(post, author, post_categories)
            })
            .collect())
    }

    async fn enrich_one(&self, post: Post) -> Result<PostView> {
        let author = match post.author_id {
            Some(id) => self.users.get_by_id(id).await?.map(|user| PostAuthor {
                id: user.id,
                username: user.username,
            }),
            None => None,
        };
        let categories = self.posts.categories_for_post(post.id).await?;
        Ok(PostView::from_parts(post, author, categories))
    }

    /// Every referenced category must exist; duplicates are tolerated.
    async fn require_categories(&self, ids: &[CategoryId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let unique: Vec<CategoryId> = ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let found = self.categories.get_by_ids(&unique).await?;
        if found.len() != unique.len() {
            return Err(category_not_found());
        }
        Ok(())
    }

    async fn require_post(&self, id: PostId) -> Result<()> {
        self.posts
            .get_by_id(id)
            .await?
            .map(|_| ())
            .ok_or_else(post_not_found)
    }
}

fn post_not_found() -> AppError {
    AppError::NotFound("Post".to_string())
}

fn category_not_found() -> AppError {
    AppError::NotFound("Category".to_string())
}

/// Reject out-of-range paging before any query runs.
fn validate_paging(page: u32, limit: u32) -> Result<()> {
    if page < 1 {
        return Err(AppError::Validation("page must be at least 1".to_string()));
    }
    if limit < 1 || limit > MAX_LIMIT {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    Ok(())
}
