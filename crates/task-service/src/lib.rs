//! Task Service Library
//!
//! A small task-management HTTP service gated behind an OAuth2-style
//! client-credentials flow. Callers authenticate with a signed JWT client
//! assertion that carries its own self-signed certificate in `x5c`; the
//! service answers with a short-lived RS256 access token.
//!
//! # Modules
//!
//! - `auth` - Key loading, assertion validation, token issuing and verification
//! - `config` - Service configuration
//! - `db` - SQLite pool and migrations
//! - `errors` - HTTP-facing error type
//! - `handlers` - HTTP request handlers
//! - `middleware` - Auth gate and HTTP metrics
//! - `models` - Request, response and domain types
//! - `observability` - Prometheus metrics
//! - `repositories` - Database access layer
//! - `routes` - Router and application state
//! - `services` - Business logic layer

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
