//! Blog route handlers.
//!
//! Anonymous callers only ever see published posts in listings; editors and
//! admins can pass `published=false` (or omit the filter) to reach drafts.
//! Direct retrieval by id or slug returns drafts for everyone so editors can
//! preview before publishing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use verdant_core::{CategoryId, PostId};

use crate::error::Result;
use crate::middleware::{OptionalUser, RequireEditor};
use crate::models::{Category, NewPost, PostChanges, PostSort, PostView};
use crate::services::ContentService;
use crate::services::content::{DEFAULT_LIMIT, PostListParams, PostPage};
use crate::state::AppState;

/// Create the blog routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/featured", get(featured_post))
        .route("/posts/slug/{slug}", get(show_post_by_slug))
        .route(
            "/posts/{id}",
            get(show_post).put(update_post).delete(remove_post),
        )
        .route("/posts/{id}/featured", put(set_featured_post))
        .route("/posts/{id}/related", get(related_posts))
        .route("/posts/{id}/categories", post(add_post_category))
        .route(
            "/posts/{id}/categories/{category_id}",
            delete(remove_post_category),
        )
        .route("/categories", get(list_categories))
}

/// Query parameters for the post listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category_id: Option<CategoryId>,
    pub published: Option<bool>,
    pub search: Option<String>,
    pub sort: Option<PostSort>,
}

/// Body for attaching a category to a post.
#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub category_id: CategoryId,
}

/// Filtered, paginated post listing.
async fn list_posts(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PostPage>> {
    let can_widen = user.as_ref().is_some_and(|u| u.role.can_edit());
    let published = if can_widen { query.published } else { Some(true) };

    let params = PostListParams {
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT),
        category_id: query.category_id,
        published,
        search: query.search,
        sort: query.sort.unwrap_or_default(),
    };

    let page = ContentService::new(state.pool()).list(params).await?;
    Ok(Json(page))
}

/// The featured post, if a published one is flagged.
async fn featured_post(State(state): State<AppState>) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool()).featured().await?;
    Ok(Json(post))
}

/// Retrieve a post by slug. Drafts included.
async fn show_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool()).get_by_slug(&slug).await?;
    Ok(Json(post))
}

/// Retrieve a post by id. Drafts included.
async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool()).get(id).await?;
    Ok(Json(post))
}

/// Published posts sharing a category with this one.
async fn related_posts(
    State(state): State<AppState>,
    Path(id): Path<PostId>,
) -> Result<Json<Vec<PostView>>> {
    let posts = ContentService::new(state.pool()).related(id).await?;
    Ok(Json(posts))
}

/// Create a post authored by the calling editor.
async fn create_post(
    State(state): State<AppState>,
    RequireEditor(editor): RequireEditor,
    Json(body): Json<NewPost>,
) -> Result<(StatusCode, Json<PostView>)> {
    let post = ContentService::new(state.pool())
        .create(editor.id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Partial update; a present `category_ids` replaces the membership set.
async fn update_post(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<PostId>,
    Json(body): Json<PostChanges>,
) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool()).update(id, body).await?;
    Ok(Json(post))
}

/// Make this post the single featured one.
async fn set_featured_post(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<PostId>,
) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool()).set_featured(id).await?;
    Ok(Json(post))
}

/// Delete a post and its category memberships.
async fn remove_post(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<PostId>,
) -> Result<Json<Value>> {
    ContentService::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Attach one category to a post.
async fn add_post_category(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<PostId>,
    Json(body): Json<AddCategoryRequest>,
) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool())
        .add_category(id, body.category_id)
        .await?;
    Ok(Json(post))
}

/// Detach one category from a post.
async fn remove_post_category(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path((id, category_id)): Path<(PostId, CategoryId)>,
) -> Result<Json<PostView>> {
    let post = ContentService::new(state.pool())
        .remove_category(id, category_id)
        .await?;
    Ok(Json(post))
}

/// All categories, alphabetical. Shared with the catalog.
async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = ContentService::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}
