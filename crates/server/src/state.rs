//! Handler-shared state.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::ServerConfig;
use crate::identity::{DisabledIdentity, IdentityClient, IdentityProvider};

/// Everything a handler needs: config, the connection pool, and the
/// identity provider. One `Arc` behind a cheap `Clone` so axum can hand
/// a copy to every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: SqlitePool,
    identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Picks the identity provider from configuration: a REST client when
    /// provider settings are present, otherwise the disabled stand-in that
    /// rejects every token.
    #[must_use]
    pub fn new(config: ServerConfig, pool: SqlitePool) -> Self {
        let identity: Arc<dyn IdentityProvider> = match &config.identity {
            Some(identity_config) => Arc::new(IdentityClient::new(identity_config.clone())),
            None => Arc::new(DisabledIdentity),
        };
        Self::with_identity(config, pool, identity)
    }

    /// Like [`AppState::new`] but with an explicit identity provider, so
    /// tests can substitute a stub.
    #[must_use]
    pub fn with_identity(
        config: ServerConfig,
        pool: SqlitePool,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                identity,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.inner.identity
    }
}
