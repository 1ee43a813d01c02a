//! HTTP middleware for the task service.
//!
//! - `auth` - Bearer-token gate for protected routes
//! - `http_metrics` - Request/response metrics for every route

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
