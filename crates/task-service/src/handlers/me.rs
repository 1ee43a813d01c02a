//! Current client handler.
//!
//! Returns the verified access-token claims placed in request extensions by
//! the auth middleware.

use crate::auth::AccessClaims;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/me` endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Client identity from the validated assertion.
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl From<AccessClaims> for MeResponse {
    fn from(claims: AccessClaims) -> Self {
        Self {
            sub: claims.sub,
            iss: claims.iss,
            aud: claims.aud,
            iat: claims.iat,
            exp: claims.exp,
            jti: claims.jti,
        }
    }
}

/// Handler for GET /me
///
/// ```json
/// {
///   "sub": "client-A",
///   "iss": "issuer-X",
///   "aud": "issuer-X/api",
///   "iat": 1234567800,
///   "exp": 1234571400,
///   "jti": "1234567800000000000"
/// }
/// ```
#[instrument(skip_all, name = "ts.handlers.me")]
pub async fn get_me(Extension(claims): Extension<AccessClaims>) -> Json<MeResponse> {
    tracing::debug!(target: "ts.handlers.me", "Returning client claims");
    Json(MeResponse::from(claims))
}
