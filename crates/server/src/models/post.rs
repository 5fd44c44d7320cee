//! Blog post domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{CategoryId, PostId, UserId};

use super::Category;
use super::double_option;

/// A stored blog post row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub author_id: Option<UserId>,
    pub published: bool,
    pub featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resolved author attached to the enriched view.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PostAuthor {
    pub id: UserId,
    pub username: String,
}

/// Post shape returned by the API: author and categories resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub featured_image: Option<String>,
    pub author: Option<PostAuthor>,
    pub published: bool,
    pub featured: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub categories: Vec<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostView {
    /// Combine a row with its resolved author and category list.
    #[must_use]
    pub fn from_parts(post: Post, author: Option<PostAuthor>, categories: Vec<Category>) -> Self {
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            featured_image: post.featured_image,
            author,
            published: post.published,
            featured: post.featured,
            published_at: post.published_at,
            categories,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

/// Payload for creating a post.
///
/// The slug is derived from the title when not supplied explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

/// Sparse changes to a post.
///
/// A present `category_ids` replaces the membership set (the service diffs
/// it against the stored set); absent leaves memberships alone.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub featured_image: Option<Option<String>>,
    pub published: Option<bool>,
    pub category_ids: Option<Vec<CategoryId>>,
}

impl PostChanges {
    /// True when neither fields nor memberships are touched.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.slug.is_none()
            && self.content.is_none()
            && self.excerpt.is_none()
            && self.featured_image.is_none()
            && self.published.is_none()
            && self.category_ids.is_none()
    }
}

/// Sort order for post listings, over `COALESCE(published_at, created_at)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostSort {
    #[default]
    Newest,
    Oldest,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_title_only_changes_leave_the_rest_alone() {
        let changes: PostChanges =
            serde_json::from_value(json!({ "title": "Harvest Notes" })).unwrap();
        assert_eq!(changes.title.as_deref(), Some("Harvest Notes"));
        assert!(changes.slug.is_none());
        assert!(changes.published.is_none());
        assert!(changes.category_ids.is_none());
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_featured_image_null_means_clear() {
        let changes: PostChanges =
            serde_json::from_value(json!({ "featured_image": null })).unwrap();
        assert_eq!(changes.featured_image, Some(None));
    }

    #[test]
    fn test_view_serializes_missing_author_as_null() {
        let post = Post {
            id: PostId::new(3),
            title: "Harvest Notes".to_string(),
            slug: "harvest-notes".to_string(),
            content: String::new(),
            excerpt: String::new(),
            featured_image: None,
            author_id: None,
            published: true,
            featured: false,
            published_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = PostView::from_parts(post, None, Vec::new());
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["author"].is_null());
        assert_eq!(json["categories"], json!([]));
    }
}
