//! HTTP middleware stack for the API server.
//!
//! Layers apply outermost-first in this order:
//!
//! 1. Sentry (one hub per request, captures panics and reported errors)
//! 2. `TraceLayer` request spans
//! 3. Request ID tagging
//! 4. CORS (explicit origins, or permissive when none configured)
//! 5. tower-sessions with the `SQLite` store
//! 6. Principal resolution (session / dev header / bearer token)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalUser, RequireAdmin, RequireEditor, RequireUser, clear_current_user, resolve_principal,
    set_current_user,
};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
