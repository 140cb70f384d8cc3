use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::SessionIdentityProvider;
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager};
use crate::gate::AccessGate;
use crate::handlers;
use crate::middleware::access_gate_middleware;
use crate::policy::SIGN_OUT_ROUTE;
use crate::profile::PgProfileStore;

#[derive(Clone, Default)]
pub struct AppState {
    /// `None` disables the access gate.
    pub gate: Option<Arc<AccessGate>>,
    pub database: Option<DatabaseManager>,
}

impl AppState {
    /// Wires the collaborators named by `config`. The gate needs both the
    /// identity provider and a database for profiles; with identity
    /// configured but no database this fails.
    pub fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let database = match config.database.url {
            Some(_) => Some(DatabaseManager::connect_lazy(&config.database)?),
            None => None,
        };

        let Some(identity) = config.identity.clone() else {
            tracing::warn!("Identity provider not configured; access gate disabled");
            return Ok(Self {
                gate: None,
                database,
            });
        };

        let database = database.ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let identity = SessionIdentityProvider::new(identity, config.security.secure_cookies);
        tracing::info!("Access gate enabled (session cookie {})", identity.cookie_name());

        let profiles = PgProfileStore::new(database.pool());
        let gate = AccessGate::new(Arc::new(identity), Arc::new(profiles));

        Ok(Self {
            gate: Some(Arc::new(gate)),
            database: Some(database),
        })
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/me", get(handlers::me))
        .route(SIGN_OUT_ROUTE, post(handlers::sign_out))
        .fallback(handlers::page)
        .layer(from_fn_with_state(state.clone(), access_gate_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
