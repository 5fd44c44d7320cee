//! Principal resolution middleware and role extractors.
//!
//! [`resolve_principal`] runs once per request, after the session layer,
//! and tries each strategy in order: session cookie, development header,
//! bearer token. The first hit becomes the request's [`CurrentUser`]
//! extension. Every resolution failure downgrades to "unauthenticated" and
//! is logged; nothing in here produces an error response. Role checks live
//! in the extractors, which read the resolved principal.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use tower_sessions::Session;

use crate::db::UserRepository;
use crate::error::AppError;
use crate::models::session::keys;
use crate::models::{CurrentUser, SessionUser, User};
use crate::services::AuthService;
use crate::state::AppState;

/// Development-only header naming a user id directly.
#[cfg(feature = "dev-auth")]
pub const DEV_USER_HEADER: &str = "x-dev-user-id";

/// Prefix marking a locally decoded development bearer token.
#[cfg(feature = "dev-auth")]
const DEV_TOKEN_PREFIX: &str = "dev-";

/// Middleware resolving the request's principal before routing.
///
/// Attach with `axum::middleware::from_fn_with_state`, inside the session
/// layer so the session extension is already present.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Authenticate against the request head only: `&Request` is not `Send`
    // (the body is `!Sync`), and holding it across an await would make the
    // middleware future unusable in axum's `from_fn_with_state`.
    let (parts, body) = request.into_parts();
    let user = authenticate(&state, &parts).await;
    request = Request::from_parts(parts, body);
    if let Some(user) = user {
        crate::error::set_sentry_user(&user.id.as_i64(), Some(user.email.as_str()));
        request.extensions_mut().insert(user);
    }

    next.run(request).await
}

/// Try each strategy in order; first hit wins.
async fn authenticate(state: &AppState, parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>();

    if let Some(session) = session
        && let Some(user) = from_session(state, session).await
    {
        return Some(user);
    }

    #[cfg(feature = "dev-auth")]
    if state.config().dev_auth
        && let Some(user) = from_dev_header(state, parts, session).await
    {
        return Some(user);
    }

    if let Some(user) = from_bearer(state, parts, session).await {
        return Some(user);
    }

    None
}

/// Strategy 1: the session already names a user; re-read the row so role
/// changes and deletions take effect immediately.
async fn from_session(state: &AppState, session: &Session) -> Option<CurrentUser> {
    let stored: SessionUser = match session.get(keys::CURRENT_USER).await {
        Ok(stored) => stored?,
        Err(e) => {
            tracing::debug!(error = %e, "session read failed");
            return None;
        }
    };

    match UserRepository::new(state.pool()).get_by_id(stored.id).await {
        Ok(Some(user)) => Some(CurrentUser::from(&user)),
        Ok(None) => {
            tracing::debug!(user_id = stored.id.as_i64(), "session names a deleted user");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "principal lookup failed");
            None
        }
    }
}

/// Strategy 2 (development builds only): `x-dev-user-id` names a user
/// directly.
#[cfg(feature = "dev-auth")]
async fn from_dev_header(
    state: &AppState,
    parts: &Parts,
    session: Option<&Session>,
) -> Option<CurrentUser> {
    let raw = parts.headers.get(DEV_USER_HEADER)?.to_str().ok()?;
    let id = raw.trim().parse::<i64>().ok()?;

    from_dev_user_id(state, id, session).await
}

/// Strategy 3: an `Authorization: Bearer` token. Development test tokens
/// are decoded locally when enabled; everything else goes to the identity
/// provider, provisioning a local account on first sight.
async fn from_bearer(
    state: &AppState,
    parts: &Parts,
    session: Option<&Session>,
) -> Option<CurrentUser> {
    let token = bearer_token(&parts.headers)?;

    #[cfg(feature = "dev-auth")]
    if state.config().dev_auth
        && let Some(id) = decode_dev_token(token)
    {
        return from_dev_user_id(state, id, session).await;
    }

    let verified = match state.identity().verify_token(token).await {
        Ok(Some(verified)) => verified,
        Ok(None) => {
            tracing::debug!("bearer token rejected by identity provider");
            return None;
        }
        Err(e) => {
            tracing::warn!(error = %e, "identity provider verification failed");
            return None;
        }
    };

    let user = match AuthService::new(state.pool())
        .link_or_provision(&verified)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "federated provisioning failed");
            return None;
        }
    };

    if let Err(e) = UserRepository::new(state.pool())
        .touch_last_login(user.id)
        .await
    {
        tracing::warn!(error = %e, "failed to record login time");
    }

    persist(session, &user).await;
    Some(CurrentUser::from(&user))
}

/// Resolve a development credential to a stored user and persist it.
#[cfg(feature = "dev-auth")]
async fn from_dev_user_id(
    state: &AppState,
    id: i64,
    session: Option<&Session>,
) -> Option<CurrentUser> {
    use verdant_core::UserId;

    match UserRepository::new(state.pool())
        .get_by_id(UserId::new(id))
        .await
    {
        Ok(Some(user)) => {
            persist(session, &user).await;
            Some(CurrentUser::from(&user))
        }
        Ok(None) => {
            tracing::debug!(user_id = id, "development credential names unknown user");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, "principal lookup failed");
            None
        }
    }
}

/// Decode a `dev-<base64 of decimal id>` test token.
#[cfg(feature = "dev-auth")]
fn decode_dev_token(token: &str) -> Option<i64> {
    use base64::Engine as _;

    let encoded = token.strip_prefix(DEV_TOKEN_PREFIX)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decimal = String::from_utf8(bytes).ok()?;
    decimal.trim().parse::<i64>().ok()
}

/// Extract the token from an `Authorization: Bearer` header.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Persist a freshly resolved principal so later requests take the session
/// path.
async fn persist(session: Option<&Session>, user: &User) {
    let Some(session) = session else { return };

    let stored = SessionUser {
        id: user.id,
        email: user.email.clone(),
    };
    if let Err(e) = set_current_user(session, &stored).await {
        tracing::warn!(error = %e, "failed to persist principal to session");
    }
}

/// Extractor that requires any authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn me(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(Self)
            .ok_or_else(unauthenticated)
    }
}

/// Extractor that requires the editor or admin role.
///
/// Unauthenticated requests get 401; authenticated users without the role
/// get 403.
pub struct RequireEditor(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireEditor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(unauthenticated)?;

        if !user.role.can_edit() {
            return Err(AppError::Forbidden("editor role required".to_string()));
        }

        Ok(Self(user))
    }
}

/// Extractor that requires exactly the admin role.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(unauthenticated)?;

        if !user.role.is_admin() {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike [`RequireUser`], this never rejects the request.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

fn unauthenticated() -> AppError {
    AppError::Unauthorized("authentication required".to_string())
}

/// Helper to set the current user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &SessionUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<SessionUser>(keys::CURRENT_USER).await?;
    Ok(())
}
