//! Authentication route handlers.
//!
//! Registration and password login establish a session; the resolver
//! middleware then recognizes it on later requests. Federated logins never
//! hit these routes: they arrive as bearer tokens and are handled by the
//! resolver directly.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{RequireUser, set_current_user};
use crate::models::{AccountChanges, SessionUser, UserView};
use crate::services::AuthService;
use crate::state::AppState;

/// Create the auth routes router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", put(profile))
}

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Self-service profile changes.
///
/// Deliberately narrower than [`AccountChanges`]: the role field only
/// exists on the admin surface.
#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Create an account and log it in.
async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>)> {
    let user = AuthService::new(state.pool())
        .register(&body.username, &body.email, &body.password)
        .await?;

    let stored = SessionUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(&session, &stored).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Password login.
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<UserView>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    let stored = SessionUser {
        id: user.id,
        email: user.email.clone(),
    };
    set_current_user(&session, &stored).await?;

    Ok(Json(user.into()))
}

/// Destroy the session.
async fn logout(RequireUser(_user): RequireUser, session: Session) -> Result<Json<Value>> {
    session.flush().await?;
    clear_sentry_user();

    Ok(Json(json!({ "success": true })))
}

/// The calling account, including timestamps the principal doesn't carry.
async fn me(State(state): State<AppState>, RequireUser(user): RequireUser) -> Result<Json<UserView>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User".to_string()))?;

    Ok(Json(user.into()))
}

/// Partial self-update; an email change re-keys the session identity.
async fn profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    session: Session,
    Json(body): Json<ProfileRequest>,
) -> Result<Json<UserView>> {
    let changes = AccountChanges {
        username: body.username,
        email: body.email,
        password: body.password,
        role: None,
    };

    let updated = AuthService::new(state.pool())
        .update_account(user.id, changes)
        .await?;

    let stored = SessionUser {
        id: updated.id,
        email: updated.email.clone(),
    };
    set_current_user(&session, &stored).await?;

    Ok(Json(updated.into()))
}
