//! Authentication middleware for protected routes.
//!
//! Extracts the Bearer token from the Authorization header, verifies it with
//! the service key, and injects the claims into request extensions.

use crate::auth::{AccessClaims, AuthError, TokenVerifier};
use crate::errors::TsError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub token_verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that verifies access tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - Returns 400 if the header is missing, malformed, or the token is invalid;
///   the handler never runs
/// - Continues to the next handler with `AccessClaims` in extensions otherwise
#[instrument(skip_all, name = "ts.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, TsError> {
    let token = bearer_token(req.headers()).inspect_err(|e| {
        tracing::debug!(target: "ts.middleware.auth", error = %e, "Rejected Authorization header");
    })?;

    let claims = state.token_verifier.verify(token)?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = match headers.get(header::AUTHORIZATION) {
        None => return Err(AuthError::MissingAuth),
        Some(value) => value.to_str().map_err(|_| AuthError::MalformedAuthHeader)?,
    };
    if value.is_empty() {
        return Err(AuthError::MissingAuth);
    }

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedAuthHeader),
    }
}

/// Extension trait for extracting claims from a request.
pub trait ClaimsExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn claims(&self) -> Option<&AccessClaims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&AccessClaims> {
        self.extensions().get::<AccessClaims>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::auth::{ServiceKeyPair, TokenIssuer};
    use axum::{
        body::Body,
        http::{HeaderValue, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;
    use ts_test_utils::crypto_fixtures::SERVICE_KEY_PKCS1_PEM;
    use ts_test_utils::test_ids::{TEST_CLIENT_A, TEST_ISSUER};

    fn keys() -> Arc<ServiceKeyPair> {
        Arc::new(ServiceKeyPair::from_pem(SERVICE_KEY_PKCS1_PEM.as_bytes()).unwrap())
    }

    /// Router with one protected route that counts handler invocations.
    fn protected_app(calls: Arc<AtomicUsize>) -> Router {
        let auth_state = Arc::new(AuthState {
            token_verifier: Arc::new(TokenVerifier::new(keys(), TEST_ISSUER)),
        });

        Router::new()
            .route(
                "/protected",
                get(move |req: Request| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        req.claims().map(|c| c.sub.clone()).unwrap_or_default()
                    }
                }),
            )
            .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
    }

    fn request(authorization: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/protected");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), Err(AuthError::MissingAuth));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(""));
        assert_eq!(bearer_token(&headers), Err(AuthError::MissingAuth));

        for malformed in ["Basic dXNlcjpwYXNz", "Bearer", "Bearer ", "bearer abc", "abc"] {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(malformed));
            assert_eq!(
                bearer_token(&headers),
                Err(AuthError::MalformedAuthHeader),
                "{malformed:?}"
            );
        }

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Ok("abc.def.ghi"));
    }

    #[tokio::test]
    async fn test_missing_header_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(calls.clone());

        let response = app.oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_token_never_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(calls.clone());

        let response = app
            .oneshot(request(Some("Bearer not.a.token")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_token_injects_claims() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = protected_app(calls.clone());
        let token = TokenIssuer::new(keys(), TEST_ISSUER, Duration::from_secs(60))
            .issue(TEST_CLIENT_A)
            .unwrap();

        let response = app
            .oneshot(request(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let body = http_body_util::BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        assert_eq!(&body[..], TEST_CLIENT_A.as_bytes());
    }
}
