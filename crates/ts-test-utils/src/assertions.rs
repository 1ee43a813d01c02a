//! Custom test assertions for expressive tests
//!
//! Provides trait-based assertions over compact JWT strings. Nothing here
//! verifies signatures; that is the service's job and is tested there.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

fn decode_segment(token: &str, index: usize) -> Value {
    let parts: Vec<_> = token.split('.').collect();
    assert_eq!(
        parts.len(),
        3,
        "JWT must have 3 parts (header.payload.signature), got {}",
        parts.len()
    );

    let bytes = URL_SAFE_NO_PAD
        .decode(parts[index])
        .unwrap_or_else(|e| panic!("Failed to base64 decode JWT segment {index}: {e}"));
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|e| panic!("Failed to parse JWT segment {index} as JSON: {e}"))
}

/// Decode the claims of a compact JWT without verifying it.
pub fn decode_claims(token: &str) -> Value {
    decode_segment(token, 1)
}

/// Custom assertions for tokens
///
/// # Example
/// ```rust,ignore
/// access_token
///     .assert_valid_jwt()
///     .assert_algorithm("RS256")
///     .assert_for_subject("client-A")
///     .assert_expires_in(3600);
/// ```
pub trait TokenAssertions {
    /// Assert that the token is a three-part JWT with JSON header and claims
    fn assert_valid_jwt(&self) -> &Self;

    /// Assert the header's `alg`
    fn assert_algorithm(&self, alg: &str) -> &Self;

    /// Assert that the token is for the specified subject
    fn assert_for_subject(&self, subject: &str) -> &Self;

    /// Assert a string claim value
    fn assert_claim(&self, name: &str, expected: &str) -> &Self;

    /// Assert that the token expires within the specified seconds
    fn assert_expires_in(&self, seconds: u64) -> &Self;
}

impl TokenAssertions for String {
    fn assert_valid_jwt(&self) -> &Self {
        let header = decode_segment(self, 0);
        assert!(
            header.get("alg").and_then(Value::as_str).is_some(),
            "JWT header must declare alg, got {header}"
        );

        let claims = decode_segment(self, 1);
        assert!(claims.is_object(), "JWT claims must be an object, got {claims}");

        self
    }

    fn assert_algorithm(&self, alg: &str) -> &Self {
        let header = decode_segment(self, 0);
        assert_eq!(
            header["alg"], alg,
            "Expected algorithm '{}', got {}",
            alg, header["alg"]
        );
        self
    }

    fn assert_for_subject(&self, subject: &str) -> &Self {
        self.assert_claim("sub", subject)
    }

    fn assert_claim(&self, name: &str, expected: &str) -> &Self {
        let claims = decode_claims(self);
        assert_eq!(
            claims[name].as_str(),
            Some(expected),
            "Expected claim '{}' to be '{}', got {}",
            name,
            expected,
            claims[name]
        );
        self
    }

    fn assert_expires_in(&self, seconds: u64) -> &Self {
        let claims = decode_claims(self);
        let exp = claims["exp"].as_i64().expect("exp claim should be an integer");

        let now = chrono::Utc::now().timestamp();
        let expires_in = exp - now;

        // Allow 5-second tolerance for slow test runs
        assert!(
            (expires_in - seconds as i64).abs() <= 5,
            "Expected token to expire in {} seconds, but expires in {} seconds",
            seconds,
            expires_in
        );

        self
    }
}
