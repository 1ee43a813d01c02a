//! Task service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. Auth
//! failures are 400 rather than 401/403. Internal details (database,
//! signing) are logged server-side and replaced with a generic message.

use crate::auth::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Task service error type.
///
/// Maps to HTTP status codes:
/// - Auth: 400 Bad Request, except signing and key failures (500)
/// - BadRequest, UnsupportedGrantType: 400 Bad Request
/// - NotFound: 404 Not Found
/// - Database: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum TsError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported grant type")]
    UnsupportedGrantType,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl TsError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TsError::Auth(e) if is_server_side(e) => 500,
            TsError::Auth(_) | TsError::BadRequest(_) | TsError::UnsupportedGrantType => 400,
            TsError::NotFound(_) => 404,
            TsError::Database(_) => 500,
        }
    }
}

fn is_server_side(error: &AuthError) -> bool {
    matches!(
        error,
        AuthError::Signing(_) | AuthError::KeyFormat(_) | AuthError::KeyType(_)
    )
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for TsError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            TsError::Auth(err) if is_server_side(err) => {
                tracing::error!(target: "ts.auth", error = %err, "Auth operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "Failed to issue access token".to_string(),
                )
            }
            TsError::Auth(err @ (AuthError::MissingAuth | AuthError::MalformedAuthHeader)) => {
                (StatusCode::BAD_REQUEST, "invalid_request", err.to_string())
            }
            TsError::Auth(
                err @ (AuthError::TokenExpired
                | AuthError::TokenInvalid(_)
                | AuthError::AlgorithmMismatch(_)),
            ) => (
                StatusCode::BAD_REQUEST,
                "invalid_token",
                format!("Invalid token: {err}"),
            ),
            TsError::Auth(err) => (
                StatusCode::BAD_REQUEST,
                "invalid_client",
                format!("Invalid client assertion: {err}"),
            ),
            TsError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "invalid_request", reason.clone())
            }
            TsError::UnsupportedGrantType => (
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                "grant_type must be client_credentials".to_string(),
            ),
            TsError::NotFound(resource) => (StatusCode::NOT_FOUND, "not_found", resource.clone()),
            TsError::Database(err) => {
                tracing::error!(target: "ts.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "An internal database error occurred".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: code,
                message,
            }),
        )
            .into_response()
    }
}

/// Convert sqlx errors to TsError
impl From<sqlx::Error> for TsError {
    fn from(err: sqlx::Error) -> Self {
        TsError::Database(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TsError::BadRequest("title must not be empty".to_string()).to_string(),
            "Bad request: title must not be empty"
        );
        assert_eq!(
            TsError::NotFound("task not found".to_string()).to_string(),
            "Not found: task not found"
        );
        assert_eq!(
            TsError::Auth(AuthError::TokenExpired).to_string(),
            "token has expired"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(TsError::Auth(AuthError::MissingAuth).status_code(), 400);
        assert_eq!(TsError::Auth(AuthError::TokenExpired).status_code(), 400);
        assert_eq!(
            TsError::Auth(AuthError::CertificateExpired).status_code(),
            400
        );
        assert_eq!(
            TsError::Auth(AuthError::Signing("boom".to_string())).status_code(),
            500
        );
        assert_eq!(TsError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(TsError::UnsupportedGrantType.status_code(), 400);
        assert_eq!(TsError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(TsError::Database("x".to_string()).status_code(), 500);
    }

    #[tokio::test]
    async fn test_into_response_missing_auth() {
        let response = TsError::from(AuthError::MissingAuth).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "invalid_request");
        assert_eq!(body["message"], "Authorization header required");
    }

    #[tokio::test]
    async fn test_into_response_invalid_token() {
        let response = TsError::from(AuthError::TokenExpired).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "invalid_token");
        assert_eq!(body["message"], "Invalid token: token has expired");
    }

    #[tokio::test]
    async fn test_into_response_issuer_mismatch_is_invalid_client() {
        let response = TsError::from(AuthError::IssuerMismatch {
            expected: "issuer-Y".to_string(),
            actual: "issuer-X".to_string(),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "invalid_client");
        assert_eq!(
            body["message"],
            "Invalid client assertion: invalid issuer: expected issuer-Y, got issuer-X"
        );
    }

    #[tokio::test]
    async fn test_into_response_signing_hides_details() {
        let response =
            TsError::from(AuthError::Signing("rsa internal detail".to_string())).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "server_error");
        assert!(!body["message"]
            .as_str()
            .unwrap()
            .contains("rsa internal detail"));
    }

    #[tokio::test]
    async fn test_into_response_unsupported_grant_type() {
        let response = TsError::UnsupportedGrantType.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "unsupported_grant_type");
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = TsError::NotFound("task not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "not_found");
        assert_eq!(body["message"], "task not found");
    }

    #[tokio::test]
    async fn test_into_response_database_error_is_generic() {
        let response = TsError::Database("no such table: tasks".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_body_json(response.into_body()).await;
        assert_eq!(body["error"], "server_error");
        assert_eq!(body["message"], "An internal database error occurred");
    }
}
