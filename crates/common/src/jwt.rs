//! JWT utilities shared by the token endpoint and the auth gate.
//!
//! This module provides:
//! - A size limit applied before any parsing
//! - Unverified decoding of the JOSE header and the claims segment
//! - The set of RSA signing algorithms the service accepts
//!
//! # Security
//!
//! Nothing decoded here has been signature-checked. Callers use the header to
//! locate a verification key (for client assertions, the `x5c` certificate)
//! and MUST verify the signature before trusting any claim.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, Header};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Typical assertions carrying a 2048-bit certificate in `x5c` are around
/// 1.5KB, and access tokens are well under 1KB. Anything larger is rejected
/// before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// RSA PKCS#1 v1.5 signing algorithms accepted for verification.
pub const RSA_ALGORITHMS: [Algorithm; 3] = [Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];

/// Errors produced while decoding a JWT without verifying it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds [`MAX_JWT_SIZE_BYTES`].
    #[error("token exceeds maximum size of {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token is not three dot-separated segments.
    #[error("token is not a compact JWT")]
    MalformedToken,

    /// Header segment is not base64url-encoded JSON describing a known algorithm.
    #[error("invalid token header: {0}")]
    InvalidHeader(String),

    /// Claims segment is not base64url-encoded JSON of the expected shape.
    #[error("invalid token claims: {0}")]
    InvalidClaims(String),
}

/// Returns true when `alg` belongs to the RSA PKCS#1 v1.5 family.
#[must_use]
pub fn is_rsa_algorithm(alg: Algorithm) -> bool {
    RSA_ALGORITHMS.contains(&alg)
}

/// Decode the JOSE header of a compact JWT without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Token does not have three non-empty segments
/// - `InvalidHeader` - Header is not valid base64url JSON, or names an unknown `alg`
pub fn decode_header_unverified(token: &str) -> Result<Header, JwtValidationError> {
    let (header_part, _) = split_segments(token)?;

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::InvalidHeader(e.to_string())
    })?;

    serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::InvalidHeader(e.to_string())
    })
}

/// Decode the claims segment of a compact JWT without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Token does not have three non-empty segments
/// - `InvalidClaims` - Claims are not valid base64url JSON matching `C`
pub fn decode_claims_unverified<C: DeserializeOwned>(token: &str) -> Result<C, JwtValidationError> {
    let (_, claims_part) = split_segments(token)?;

    let claims_bytes = URL_SAFE_NO_PAD.decode(claims_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT claims base64");
        JwtValidationError::InvalidClaims(e.to_string())
    })?;

    serde_json::from_slice(&claims_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT claims JSON");
        JwtValidationError::InvalidClaims(e.to_string())
    })
}

/// Size-check a token and return its header and claims segments.
fn split_segments(token: &str) -> Result<(&str, &str), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(claims), Some(signature), None)
            if !header.is_empty() && !claims.is_empty() && !signature.is_empty() =>
        {
            Ok((header, claims))
        }
        _ => {
            tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn encode_segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn token_from(header: &str, claims: &str) -> String {
        format!(
            "{}.{}.c2lnbmF0dXJl",
            encode_segment(header),
            encode_segment(claims)
        )
    }

    #[derive(Debug, Deserialize)]
    struct SubjectOnly {
        sub: String,
    }

    #[test]
    fn test_decode_header_reads_alg_and_x5c() {
        let token = token_from(
            r#"{"alg":"RS256","typ":"JWT","x5c":["MIIB"]}"#,
            r#"{"sub":"client-1"}"#,
        );

        let header = decode_header_unverified(&token).expect("header should decode");

        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.x5c, Some(vec!["MIIB".to_string()]));
    }

    #[test]
    fn test_decode_claims_reads_subject() {
        let token = token_from(r#"{"alg":"RS256"}"#, r#"{"sub":"client-1","iss":"x"}"#);

        let claims: SubjectOnly = decode_claims_unverified(&token).expect("claims should decode");

        assert_eq!(claims.sub, "client-1");
    }

    #[test]
    fn test_oversized_token_rejected_before_parsing() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);

        assert_eq!(
            decode_header_unverified(&token).unwrap_err(),
            JwtValidationError::TokenTooLarge
        );
    }

    #[test]
    fn test_token_at_size_limit_is_not_rejected_for_size() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES);

        // Exactly at the limit: fails for format, not for size
        assert_eq!(
            decode_header_unverified(&token).unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        for token in ["only-one", "two.parts", "a.b.c.d", "a..c", ".b.c", "a.b."] {
            assert_eq!(
                decode_header_unverified(token).unwrap_err(),
                JwtValidationError::MalformedToken,
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_bad_base64_header_is_invalid_header() {
        let result = decode_header_unverified("!!!.e30.c2ln");
        assert!(matches!(result, Err(JwtValidationError::InvalidHeader(_))));
    }

    #[test]
    fn test_unknown_algorithm_is_invalid_header() {
        let token = token_from(r#"{"alg":"none"}"#, r#"{"sub":"client-1"}"#);

        let result = decode_header_unverified(&token);

        assert!(matches!(result, Err(JwtValidationError::InvalidHeader(_))));
    }

    #[test]
    fn test_claims_missing_field_is_invalid_claims() {
        let token = token_from(r#"{"alg":"RS256"}"#, r#"{"iss":"x"}"#);

        let result: Result<SubjectOnly, _> = decode_claims_unverified(&token);

        assert!(matches!(result, Err(JwtValidationError::InvalidClaims(_))));
    }

    #[test]
    fn test_rsa_algorithm_family() {
        assert!(is_rsa_algorithm(Algorithm::RS256));
        assert!(is_rsa_algorithm(Algorithm::RS384));
        assert!(is_rsa_algorithm(Algorithm::RS512));
        assert!(!is_rsa_algorithm(Algorithm::HS256));
        assert!(!is_rsa_algorithm(Algorithm::ES256));
        assert!(!is_rsa_algorithm(Algorithm::PS256));
        assert!(!is_rsa_algorithm(Algorithm::EdDSA));
    }
}
