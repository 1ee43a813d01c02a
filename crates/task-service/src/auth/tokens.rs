//! Access token issuing and verification.
//!
//! Access tokens are RS256 JWTs signed with the service key. The audience is
//! always the issuer followed by `/api`.

use crate::auth::claims::AccessClaims;
use crate::auth::error::AuthError;
use crate::auth::keys::ServiceKeyPair;
use crate::observability::metrics::{record_token_issuance, record_token_validation};
use chrono::{DateTime, Utc};
use common::jwt::{decode_header_unverified, is_rsa_algorithm, RSA_ALGORITHMS};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Suffix appended to the issuer to form the access-token audience.
pub const AUDIENCE_SUFFIX: &str = "/api";

pub fn audience_for(issuer: &str) -> String {
    format!("{issuer}{AUDIENCE_SUFFIX}")
}

/// Mints access tokens for authenticated clients.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    keys: Arc<ServiceKeyPair>,
    issuer: String,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(keys: Arc<ServiceKeyPair>, issuer: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            lifetime,
        }
    }

    /// Configured token lifetime, reported as `expires_in`.
    pub fn lifetime_seconds(&self) -> u64 {
        self.lifetime.as_secs()
    }

    /// Issue a signed access token for `subject`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Signing` if the lifetime cannot be represented or
    /// signing fails.
    #[instrument(skip_all, name = "ts.auth.issue")]
    pub fn issue(&self, subject: &str) -> Result<String, AuthError> {
        let start = Instant::now();
        let result = self.issue_at(subject, Utc::now());

        match &result {
            Ok(_) => record_token_issuance("success", None, start.elapsed()),
            Err(e) => {
                tracing::error!(target: "ts.auth.issue", error = %e, "Failed to issue access token");
                record_token_issuance("error", Some(e.metric_label()), start.elapsed());
            }
        }

        result
    }

    pub(crate) fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        let lifetime = chrono::Duration::from_std(self.lifetime)
            .map_err(|e| AuthError::Signing(format!("token lifetime out of range: {e}")))?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".to_string()))?;

        let claims = AccessClaims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            aud: audience_for(&self.issuer),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: now
                .timestamp_nanos_opt()
                .unwrap_or(now.timestamp_micros())
                .to_string(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());

        encode(&header, &claims, self.keys.encoding_key())
            .map_err(|e| AuthError::Signing(e.to_string()))
    }
}

/// Verifies access tokens issued by this service.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<ServiceKeyPair>,
    issuer: String,
    audience: String,
}

impl TokenVerifier {
    pub fn new(keys: Arc<ServiceKeyPair>, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();
        Self {
            keys,
            audience: audience_for(&issuer),
            issuer,
        }
    }

    /// Verify an access token and return its claims.
    ///
    /// # Errors
    ///
    /// - `AlgorithmMismatch` - Declared algorithm is not RS256/RS384/RS512
    /// - `TokenExpired` - `exp` is in the past (no leeway)
    /// - `TokenInvalid` - Any other structural, issuer, audience or signature failure
    #[instrument(skip_all, name = "ts.auth.verify")]
    pub fn verify(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let start = Instant::now();
        let result = self.verify_at(token, Utc::now().timestamp());

        match &result {
            Ok(_) => record_token_validation("success", None, start.elapsed()),
            Err(e) => {
                tracing::debug!(target: "ts.auth.verify", error = %e, "Access token rejected");
                record_token_validation("error", Some(e.metric_label()), start.elapsed());
            }
        }

        result
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<AccessClaims, AuthError> {
        let header =
            decode_header_unverified(token).map_err(|e| AuthError::TokenInvalid(e.to_string()))?;
        if !is_rsa_algorithm(header.alg) {
            return Err(AuthError::AlgorithmMismatch(format!("{:?}", header.alg)));
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = RSA_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);

        let claims = decode::<AccessClaims>(token, self.keys.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })?;

        if now > claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}
