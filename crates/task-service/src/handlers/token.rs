//! Token endpoint: exchanges a signed client assertion for an access token.

use crate::errors::TsError;
use crate::models::{TokenRequest, TokenResponse};
use crate::routes::AppState;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::{Form, Json};
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

pub const CLIENT_CREDENTIALS: &str = "client_credentials";

/// Handler for POST /token
///
/// Form fields:
/// - `grant_type` - must be `client_credentials`
/// - `client_assertion` - signed JWT carrying its certificate in `x5c`
/// - `client_assertion_type` - required, recorded for tracing only
///
/// Returns 200 with `{access_token, token_type, expires_in}`.
#[instrument(skip_all, name = "ts.handlers.token")]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, TsError> {
    let Form(request) = form.map_err(|e| TsError::BadRequest(e.body_text()))?;

    if request.grant_type.as_deref() != Some(CLIENT_CREDENTIALS) {
        return Err(TsError::UnsupportedGrantType);
    }

    let assertion = request
        .client_assertion
        .as_ref()
        .map(|a| a.expose_secret())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| TsError::BadRequest("client_assertion is required".to_string()))?;

    let assertion_type = request
        .client_assertion_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TsError::BadRequest("client_assertion_type is required".to_string()))?;

    let validated = state
        .assertion_validator
        .validate(assertion, assertion_type)?;

    let access_token = state.token_issuer.issue(&validated.subject)?;

    tracing::info!(target: "ts.handlers.token", "Access token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.token_issuer.lifetime_seconds(),
    }))
}
