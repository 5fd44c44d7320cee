//! Category route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use verdant_core::CategoryId;

use crate::error::Result;
use crate::middleware::RequireEditor;
use crate::models::{Category, CategoryChanges, NewCategory};
use crate::services::CatalogService;
use crate::state::AppState;

/// Create the category routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", put(update).delete(remove))
}

/// All categories, alphabetical.
async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    let categories = CatalogService::new(state.pool()).list_categories().await?;
    Ok(Json(categories))
}

/// Create a category; slug derives from the name when omitted.
async fn create(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Json(body): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>)> {
    let category = CatalogService::new(state.pool()).create_category(body).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Rename a category or replace its slug.
async fn update(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<CategoryId>,
    Json(body): Json<CategoryChanges>,
) -> Result<Json<Category>> {
    let category = CatalogService::new(state.pool())
        .update_category(id, body)
        .await?;
    Ok(Json(category))
}

/// Delete a category; memberships go with it, products and posts stay.
async fn remove(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<CategoryId>,
) -> Result<Json<Value>> {
    CatalogService::new(state.pool()).delete_category(id).await?;
    Ok(Json(json!({ "success": true })))
}
