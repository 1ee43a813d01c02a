//! Builder patterns for test token construction
//!
//! Provides fluent APIs for signing client assertions and access tokens.

use crate::crypto_fixtures::{client_certificate_der, CLIENT_KEY_PKCS1_PEM, SERVICE_KEY_PKCS1_PEM};
use crate::test_ids::{TEST_CLIENT_A, TEST_ISSUER};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use serde_json::{json, Map, Value};
use sha2::{Sha256, Sha384, Sha512};

/// Builder for client assertions
///
/// Defaults produce an assertion the test server accepts: subject
/// [`TEST_CLIENT_A`], issuer [`TEST_ISSUER`], a current certificate in `x5c`,
/// RS256 over the matching client key, expiring in five minutes.
///
/// # Example
/// ```rust,ignore
/// let assertion = TestAssertionBuilder::new()
///     .for_client("client-A")
///     .issued_by("issuer-X")
///     .build();
/// ```
pub struct TestAssertionBuilder {
    subject: Option<String>,
    issuer: Option<String>,
    x5c: Option<Vec<String>>,
    signing_key_pem: String,
    algorithm: Algorithm,
    expires_at: Option<i64>,
    issued_at: i64,
}

impl TestAssertionBuilder {
    /// Create a new assertion builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let certificate =
            client_certificate_der(TEST_CLIENT_A).expect("client certificate should generate");

        Self {
            subject: Some(TEST_CLIENT_A.to_string()),
            issuer: Some(TEST_ISSUER.to_string()),
            x5c: Some(vec![STANDARD.encode(certificate)]),
            signing_key_pem: CLIENT_KEY_PKCS1_PEM.to_string(),
            algorithm: Algorithm::RS256,
            expires_at: Some((now + Duration::seconds(300)).timestamp()),
            issued_at: now.timestamp(),
        }
    }

    /// Set the subject (client identity)
    pub fn for_client(mut self, subject: &str) -> Self {
        self.subject = Some(subject.to_string());
        self
    }

    /// Omit the `sub` claim
    pub fn without_subject(mut self) -> Self {
        self.subject = None;
        self
    }

    /// Set the issuer
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.issuer = Some(issuer.to_string());
        self
    }

    /// Omit the `iss` claim
    pub fn without_issuer(mut self) -> Self {
        self.issuer = None;
        self
    }

    /// Place a DER certificate as the sole `x5c` entry
    pub fn with_certificate_der(mut self, der: &[u8]) -> Self {
        self.x5c = Some(vec![STANDARD.encode(der)]);
        self
    }

    /// Set raw `x5c` entries
    pub fn with_x5c(mut self, entries: Vec<String>) -> Self {
        self.x5c = Some(entries);
        self
    }

    /// Omit the `x5c` header
    pub fn without_x5c(mut self) -> Self {
        self.x5c = None;
        self
    }

    /// Sign with a different key (PEM, PKCS#1 or PKCS#8 for RSA; raw bytes for HMAC)
    pub fn signed_with(mut self, key_pem: &str) -> Self {
        self.signing_key_pem = key_pem.to_string();
        self
    }

    /// Declare and sign with a different algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_at = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Omit the `exp` claim
    pub fn without_expiry(mut self) -> Self {
        self.expires_at = None;
        self
    }

    /// Sign and serialize the assertion
    pub fn build(self) -> String {
        let mut claims = Map::new();
        if let Some(iss) = self.issuer {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(sub) = self.subject {
            claims.insert("sub".to_string(), json!(sub));
        }
        claims.insert("aud".to_string(), json!("task-service"));
        claims.insert("iat".to_string(), json!(self.issued_at));
        if let Some(exp) = self.expires_at {
            claims.insert("exp".to_string(), json!(exp));
        }

        let mut header = Header::new(self.algorithm);
        header.x5c = self.x5c;

        sign(&header, &Value::Object(claims), &self.signing_key_pem)
    }
}

impl Default for TestAssertionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for access tokens signed outside the service's issuer
///
/// Lets tests present tokens the service never issued: expired ones, ones
/// from another issuer, or ones signed by a foreign key.
///
/// # Example
/// ```rust,ignore
/// let token = TestAccessTokenBuilder::new()
///     .for_subject("client-A")
///     .expires_in(-10)
///     .build();
/// ```
pub struct TestAccessTokenBuilder {
    sub: String,
    iss: String,
    aud: String,
    exp: i64,
    iat: i64,
    signing_key_pem: String,
    algorithm: Algorithm,
}

impl TestAccessTokenBuilder {
    /// Create a new access-token builder matching the test server's issuer and key
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: TEST_CLIENT_A.to_string(),
            iss: TEST_ISSUER.to_string(),
            aud: format!("{TEST_ISSUER}/api"),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            signing_key_pem: SERVICE_KEY_PKCS1_PEM.to_string(),
            algorithm: Algorithm::RS256,
        }
    }

    /// Set the subject
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer; the audience follows it
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self.aud = format!("{issuer}/api");
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Sign with a different key
    pub fn signed_with(mut self, key_pem: &str) -> Self {
        self.signing_key_pem = key_pem.to_string();
        self
    }

    /// Declare and sign with a different algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sign and serialize the token
    pub fn build(self) -> String {
        let claims = json!({
            "iss": self.iss,
            "sub": self.sub,
            "aud": self.aud,
            "iat": self.iat,
            "exp": self.exp,
            "jti": format!("test-{}", self.iat),
        });

        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".to_string());

        sign(&header, &claims, &self.signing_key_pem)
    }
}

impl Default for TestAccessTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Corrupt the first byte of a compact JWT's signature.
pub fn tamper_signature(token: &str) -> String {
    tamper_signature_byte(token, 0)
}

/// Flip the low bit of signature byte `index` (clamped to the last byte).
pub fn tamper_signature_byte(token: &str, index: usize) -> String {
    let (signed_part, signature) = token.rsplit_once('.').expect("token should have a signature");
    let mut bytes = URL_SAFE_NO_PAD
        .decode(signature)
        .expect("signature should be base64url");
    let last = bytes.len().checked_sub(1).expect("signature should not be empty");
    bytes[index.min(last)] ^= 0x01;
    format!("{signed_part}.{}", URL_SAFE_NO_PAD.encode(bytes))
}

fn sign(header: &Header, claims: &Value, key_pem: &str) -> String {
    match header.alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            let key = EncodingKey::from_secret(key_pem.as_bytes());
            encode(header, claims, &key).expect("test token should sign")
        }
        alg => sign_pkcs1v15(header, claims, key_pem, alg),
    }
}

/// RSASSA-PKCS1-v1_5 signing through `rsa` directly, so keys below the
/// 2048-bit floor of the jsonwebtoken backend can still produce fixtures.
fn sign_pkcs1v15(header: &Header, claims: &Value, key_pem: &str, alg: Algorithm) -> String {
    let key = RsaPrivateKey::from_pkcs1_pem(key_pem)
        .or_else(|_| RsaPrivateKey::from_pkcs8_pem(key_pem))
        .expect("signing key should be RSA PEM");

    let header_json = serde_json::to_vec(header).expect("header should serialize");
    let claims_json = serde_json::to_vec(claims).expect("claims should serialize");
    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );

    let message = signing_input.as_bytes();
    let signature = match alg {
        Algorithm::RS256 => SigningKey::<Sha256>::new(key).sign(message).to_vec(),
        Algorithm::RS384 => SigningKey::<Sha384>::new(key).sign(message).to_vec(),
        Algorithm::RS512 => SigningKey::<Sha512>::new(key).sign(message).to_vec(),
        other => panic!("unsupported test signing algorithm: {other:?}"),
    };

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::TokenAssertions;
    use crate::crypto_fixtures::LEGACY_KEY_1024_PKCS1_PEM;

    #[test]
    fn test_assertion_builder_defaults() {
        let assertion = TestAssertionBuilder::new().build();

        assertion
            .assert_valid_jwt()
            .assert_algorithm("RS256")
            .assert_for_subject(TEST_CLIENT_A)
            .assert_claim("iss", TEST_ISSUER);

        let header = jsonwebtoken::decode_header(&assertion).unwrap();
        assert_eq!(header.x5c.map(|c| c.len()), Some(1));
    }

    #[test]
    fn test_assertion_builder_without_x5c() {
        let assertion = TestAssertionBuilder::new().without_x5c().build();

        let header = jsonwebtoken::decode_header(&assertion).unwrap();
        assert!(header.x5c.is_none());
    }

    #[test]
    fn test_access_token_builder_audience_follows_issuer() {
        let token = TestAccessTokenBuilder::new().issued_by("issuer-Z").build();

        token
            .assert_valid_jwt()
            .assert_claim("iss", "issuer-Z")
            .assert_claim("aud", "issuer-Z/api");
    }

    #[test]
    fn test_tamper_signature_changes_only_signature() {
        let token = TestAccessTokenBuilder::new().build();
        let tampered = tamper_signature(&token);

        assert_ne!(token, tampered);
        let (original_head, _) = token.rsplit_once('.').unwrap();
        let (tampered_head, _) = tampered.rsplit_once('.').unwrap();
        assert_eq!(original_head, tampered_head);
    }

    #[test]
    fn test_tamper_signature_byte_targets_requested_position() {
        let token = TestAccessTokenBuilder::new().build();
        let original = URL_SAFE_NO_PAD
            .decode(token.rsplit_once('.').unwrap().1)
            .unwrap();

        for index in [0, original.len() / 2, original.len() - 1] {
            let tampered = tamper_signature_byte(&token, index);
            let bytes = URL_SAFE_NO_PAD
                .decode(tampered.rsplit_once('.').unwrap().1)
                .unwrap();

            let changed: Vec<usize> = (0..bytes.len()).filter(|&i| bytes[i] != original[i]).collect();
            assert_eq!(changed, vec![index]);
        }
    }

    #[test]
    fn test_rsa_signing_matches_jsonwebtoken() {
        let header = Header::new(Algorithm::RS256);
        let claims = json!({"sub": TEST_CLIENT_A});

        let ours = sign(&header, &claims, SERVICE_KEY_PKCS1_PEM);
        let reference = encode(
            &header,
            &claims,
            &EncodingKey::from_rsa_pem(SERVICE_KEY_PKCS1_PEM.as_bytes()).unwrap(),
        )
        .unwrap();

        assert_eq!(ours, reference);
    }

    #[test]
    fn test_small_rsa_key_still_signs() {
        let token = TestAccessTokenBuilder::new()
            .signed_with(LEGACY_KEY_1024_PKCS1_PEM)
            .build();

        token.assert_valid_jwt().assert_algorithm("RS256");
    }
}
