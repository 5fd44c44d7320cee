//! Admin user management route handlers.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};

use verdant_core::UserId;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{AccountChanges, UserView};
use crate::services::AuthService;
use crate::state::AppState;

/// Create the user management routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(show).put(update).delete(remove))
}

/// All accounts, oldest first.
async fn list(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<UserView>>> {
    let users = UserRepository::new(state.pool()).list().await?;
    Ok(Json(users.into_iter().map(UserView::from).collect()))
}

/// One account.
async fn show(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<UserView>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;
    Ok(Json(user.into()))
}

/// Update any account, including its role.
async fn update(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<UserId>,
    Json(body): Json<AccountChanges>,
) -> Result<Json<UserView>> {
    let user = AuthService::new(state.pool()).update_account(id, body).await?;
    Ok(Json(user.into()))
}

/// Delete an account, deprovisioning at the identity provider first.
///
/// If the provider call fails the local row stays, so a retry can finish
/// the job.
async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<UserId>,
) -> Result<Json<Value>> {
    if id == admin.id {
        return Err(AppError::Validation(
            "cannot delete your own account".to_string(),
        ));
    }

    let users = UserRepository::new(state.pool());
    let user = users
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    if let Some(uid) = &user.external_uid {
        state.identity().delete_account(uid).await?;
    }

    if users.delete(id).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Err(AppError::NotFound("User".to_string()))
    }
}
