//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Handler for GET /health
///
/// Runs `SELECT 1` against the pool. Returns 200 when the database answers
/// and 503 otherwise; the database error is logged, not returned.
#[tracing::instrument(skip_all, name = "ts.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                database: "healthy",
            }),
        ),
        Err(e) => {
            tracing::warn!(target: "ts.health", error = %e, "Health check failed: database error");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy",
                    database: "unhealthy",
                }),
            )
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let json = serde_json::to_string(&HealthResponse {
            status: "healthy",
            database: "healthy",
        })
        .unwrap();

        assert_eq!(json, r#"{"status":"healthy","database":"healthy"}"#);
    }

    // The handler itself is exercised end-to-end in tests/health_tests.rs.
}
