//! Client-side assertion signing.
//!
//! Builds the RS256 client assertion a caller presents to `POST /token`:
//! claims signed with the client's private key, with the client certificate
//! embedded as the single `x5c` entry. Used by the `generate-assertion`
//! binary to exercise the token endpoint by hand.

use crate::auth::claims::{AssertionClaims, Audience};
use crate::auth::error::AuthError;
use crate::auth::keys::ServiceKeyPair;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use std::time::Duration;
use x509_parser::pem::parse_x509_pem;

/// Claims for a generated client assertion.
#[derive(Debug, Clone)]
pub struct AssertionRequest {
    /// Must match the service's `JWT_ISSUER`.
    pub issuer: String,
    pub subject: String,
    pub audience: String,
    pub lifetime: Duration,
    pub jti: Option<String>,
}

/// Sign a client assertion with `key_pem` and embed `cert_pem` in `x5c`.
///
/// # Errors
///
/// - `KeyFormat` / `KeyType` - `key_pem` is not a usable RSA private key
/// - `CertificateParse` - `cert_pem` holds no parseable X.509 certificate
/// - `Signing` - lifetime out of range or signing failed
pub fn sign_client_assertion(
    key_pem: &[u8],
    cert_pem: &[u8],
    request: &AssertionRequest,
) -> Result<String, AuthError> {
    sign_client_assertion_at(key_pem, cert_pem, request, Utc::now())
}

pub(crate) fn sign_client_assertion_at(
    key_pem: &[u8],
    cert_pem: &[u8],
    request: &AssertionRequest,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let key = ServiceKeyPair::from_pem(key_pem)?;

    let (_, cert_block) = parse_x509_pem(cert_pem)
        .map_err(|e| AuthError::CertificateParse(format!("failed to decode PEM block: {e}")))?;
    cert_block
        .parse_x509()
        .map_err(|e| AuthError::CertificateParse(e.to_string()))?;

    let lifetime = chrono::Duration::from_std(request.lifetime)
        .map_err(|e| AuthError::Signing(format!("assertion lifetime out of range: {e}")))?;
    let expires_at = now
        .checked_add_signed(lifetime)
        .ok_or_else(|| AuthError::Signing("assertion expiry out of range".to_string()))?;

    let claims = AssertionClaims {
        iss: request.issuer.clone(),
        sub: request.subject.clone(),
        aud: Some(Audience::Single(request.audience.clone())),
        exp: Some(expires_at.timestamp()),
        iat: Some(now.timestamp()),
        nbf: None,
        jti: request.jti.clone(),
    };

    let mut header = Header::new(Algorithm::RS256);
    header.typ = Some("JWT".to_string());
    header.x5c = Some(vec![STANDARD.encode(&cert_block.contents)]);

    encode(&header, &claims, key.encoding_key()).map_err(|e| AuthError::Signing(e.to_string()))
}
