//! HTTP routes for the task service.
//!
//! Defines the Axum router and application state.

use crate::auth::{AssertionValidator, ServiceKeyPair, TokenIssuer, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: SqlitePool,

    /// Service configuration.
    pub config: Config,

    pub assertion_validator: Arc<AssertionValidator>,

    pub token_issuer: Arc<TokenIssuer>,

    pub token_verifier: Arc<TokenVerifier>,
}

impl AppState {
    /// Wire the auth components to one shared service key.
    pub fn new(pool: SqlitePool, config: Config, keys: Arc<ServiceKeyPair>) -> Self {
        let issuer = config.jwt_issuer.clone();
        Self {
            pool,
            assertion_validator: Arc::new(AssertionValidator::new(issuer.clone())),
            token_issuer: Arc::new(TokenIssuer::new(
                keys.clone(),
                issuer.clone(),
                config.token_lifetime,
            )),
            token_verifier: Arc::new(TokenVerifier::new(keys, issuer)),
            config,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/token` - Client-credentials token endpoint - public
/// - `/health` - Database-backed health check - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/me` - Verified token claims - requires authentication
/// - `/tasks`, `/tasks/:id` - Task CRUD - requires authentication
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = Arc::new(AuthState {
        token_verifier: state.token_verifier.clone(),
    });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/token", post(handlers::issue_token))
        .route("/health", get(handlers::health_check))
        .with_state(state.clone());

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route(
            "/tasks",
            post(handlers::create_task).get(handlers::list_tasks),
        )
        .route(
            "/tasks/:id",
            get(handlers::get_task)
                .patch(handlers::update_task)
                .delete(handlers::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
