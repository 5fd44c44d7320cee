//! Product route handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use verdant_core::ProductId;

use crate::error::Result;
use crate::middleware::RequireEditor;
use crate::models::{
    FeatureChanges, NewProduct, ProductChanges, ProductFeatures, ProductSort, ProductView,
    VendorView,
};
use crate::services::CatalogService;
use crate::services::catalog::{DEFAULT_PER_PAGE, ProductListParams, ProductPage};
use crate::state::AppState;

/// Create the product routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).patch(update).delete(remove))
        .route("/{id}/features", put(set_features))
        .route("/{id}/related", get(related))
        .route("/{id}/vendors", get(vendors))
}

/// Query parameters for the product listing.
///
/// The eight feature flags are declared inline: query-string deserialization
/// can't route booleans through a flattened struct, so there is no
/// [`FeatureChanges`] here.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Comma-separated category slugs, OR semantics.
    pub categories: Option<String>,
    pub organic: Option<bool>,
    pub vegan: Option<bool>,
    pub gluten_free: Option<bool>,
    pub lactose_free: Option<bool>,
    pub sugar_free: Option<bool>,
    pub nut_free: Option<bool>,
    pub soy_free: Option<bool>,
    pub fair_trade: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort: Option<ProductSort>,
}

/// Filtered, paginated product listing.
async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductPage>> {
    let params = ProductListParams {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(DEFAULT_PER_PAGE),
        category_slugs: split_list(query.categories.as_deref()),
        flags: FeatureChanges {
            organic: query.organic,
            vegan: query.vegan,
            gluten_free: query.gluten_free,
            lactose_free: query.lactose_free,
            sugar_free: query.sugar_free,
            nut_free: query.nut_free,
            soy_free: query.soy_free,
            fair_trade: query.fair_trade,
        },
        min_price: query.min_price,
        max_price: query.max_price,
        search: query.search,
        sort: query.sort.unwrap_or_default(),
    };

    let page = CatalogService::new(state.pool()).list(params).await?;
    Ok(Json(page))
}

/// Enriched product retrieve.
async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.pool()).get(id).await?;
    Ok(Json(product))
}

/// Related products for a product page.
async fn related(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<ProductView>>> {
    let products = CatalogService::new(state.pool()).related(id).await?;
    Ok(Json(products))
}

/// Vendor offers for a product, cheapest first.
async fn vendors(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Vec<VendorView>>> {
    let vendors = CatalogService::new(state.pool()).vendors_for(id).await?;
    Ok(Json(vendors))
}

/// Create a product.
async fn create(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let product = CatalogService::new(state.pool()).create(body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Canonical partial update.
async fn update(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductChanges>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.pool()).update(id, body).await?;
    Ok(Json(product))
}

/// Overwrite all eight feature flags; omitted flags become false.
async fn set_features(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<ProductId>,
    Json(body): Json<ProductFeatures>,
) -> Result<Json<ProductView>> {
    let product = CatalogService::new(state.pool())
        .overwrite_features(id, body)
        .await?;
    Ok(Json(product))
}

/// Delete a product and its vendor offers.
async fn remove(
    State(state): State<AppState>,
    RequireEditor(_editor): RequireEditor,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    CatalogService::new(state.pool()).delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Split a comma-separated query value, dropping empty entries.
pub(crate) fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list() {
        assert_eq!(
            split_list(Some("snacks, pantry ,,")),
            vec!["snacks".to_string(), "pantry".to_string()]
        );
        assert!(split_list(Some("")).is_empty());
        assert!(split_list(None).is_empty());
    }

    #[test]
    fn test_list_query_parses_flags_and_bounds() {
        let query: ListQuery = serde_urlencoded::from_str(
            "page=2&per_page=5&organic=true&min_price=1.50&sort=price-asc",
        )
        .unwrap();
        assert_eq!(query.page, Some(2));
        assert_eq!(query.per_page, Some(5));
        assert_eq!(query.organic, Some(true));
        assert_eq!(query.min_price.unwrap().to_string(), "1.50");
        assert_eq!(query.sort, Some(ProductSort::PriceAsc));
        assert_eq!(query.vegan, None);
    }
}
