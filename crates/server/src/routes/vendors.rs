//! Vendor offer route handlers.
//!
//! Offers are read through `/api/products/{id}/vendors`; this router only
//! carries the editor-facing write operations.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{Value, json};

use verdant_core::VendorId;

use crate::error::Result;
use crate::middleware::RequireEditor;
use crate::models::{NewVendor, VendorChanges, VendorView};
use crate::services::CatalogService;
use crate::state::AppState;

/// Create the vendor routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(remove))
}

/// Attach a vendor offer to a product.
async fn create(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Json(body): Json<NewVendor>,
) -> Result<(StatusCode, Json<VendorView>)> {
    let vendor = CatalogService::new(state.pool()).add_vendor(body).await?;
    Ok((StatusCode::CREATED, Json(vendor)))
}

/// Update a vendor offer's name, price, or availability.
async fn update(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<VendorId>,
    Json(body): Json<VendorChanges>,
) -> Result<Json<VendorView>> {
    let vendor = CatalogService::new(state.pool())
        .update_vendor(id, body)
        .await?;
    Ok(Json(vendor))
}

/// Remove a vendor offer.
async fn remove(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<VendorId>,
) -> Result<Json<Value>> {
    CatalogService::new(state.pool()).delete_vendor(id).await?;
    Ok(Json(json!({ "success": true })))
}
