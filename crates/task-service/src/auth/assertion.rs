//! Client assertion validation.
//!
//! A client assertion is a JWT signed by the client with the private key of
//! a certificate it embeds in the `x5c` header. Trust comes from three
//! checks: the signature verifies against that certificate's RSA key, the
//! issuer claim equals the configured trusted issuer, and the certificate is
//! inside its validity window. No CA chain is consulted.

use crate::auth::claims::AssertionClaims;
use crate::auth::error::AuthError;
use crate::observability::metrics::record_assertion_validation;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use common::jwt::{decode_claims_unverified, decode_header_unverified, is_rsa_algorithm};
use jsonwebtoken::Algorithm;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::time::Instant;
use tracing::instrument;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;

/// Result of a successful assertion validation.
#[derive(Clone)]
pub struct ValidatedAssertion {
    /// Client identity from the `sub` claim.
    pub subject: String,
    pub claims: AssertionClaims,
}

impl fmt::Debug for ValidatedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedAssertion")
            .field("subject", &"[REDACTED]")
            .field("claims", &self.claims)
            .finish()
    }
}

/// Validates client assertions against a single trusted issuer.
#[derive(Debug, Clone)]
pub struct AssertionValidator {
    trusted_issuer: String,
}

impl AssertionValidator {
    pub fn new(trusted_issuer: impl Into<String>) -> Self {
        Self {
            trusted_issuer: trusted_issuer.into(),
        }
    }

    pub fn trusted_issuer(&self) -> &str {
        &self.trusted_issuer
    }

    /// Validate a client assertion.
    ///
    /// `assertion_type` is recorded in the span but does not change behavior.
    ///
    /// # Errors
    ///
    /// Returns the `AuthError` variant for the first failed check, in order:
    /// `Parse`, `MissingCertificate`, `CertificateParse`, `UnsupportedKeyType`,
    /// `SignatureInvalid` / `AssertionExpired`, `IssuerMismatch`,
    /// `CertificateExpired` / `CertificateNotYetValid`.
    #[instrument(skip_all, name = "ts.auth.assertion", fields(assertion_type = %assertion_type))]
    pub fn validate(
        &self,
        assertion: &str,
        assertion_type: &str,
    ) -> Result<ValidatedAssertion, AuthError> {
        let start = Instant::now();
        let result = self.validate_at(assertion, Utc::now().timestamp());

        match &result {
            Ok(_) => record_assertion_validation("success", None, start.elapsed()),
            Err(e) => {
                tracing::debug!(target: "ts.auth.assertion", error = %e, "Client assertion rejected");
                record_assertion_validation("error", Some(e.metric_label()), start.elapsed());
            }
        }

        result
    }

    /// Validation against an explicit `now` (Unix seconds) for the certificate window.
    pub(crate) fn validate_at(
        &self,
        assertion: &str,
        now: i64,
    ) -> Result<ValidatedAssertion, AuthError> {
        let header =
            decode_header_unverified(assertion).map_err(|e| AuthError::Parse(e.to_string()))?;
        let unverified: AssertionClaims =
            decode_claims_unverified(assertion).map_err(|e| AuthError::Parse(e.to_string()))?;
        if unverified.sub.trim().is_empty() {
            return Err(AuthError::Parse("missing 'sub' claim".to_string()));
        }

        let encoded_cert = header
            .x5c
            .as_deref()
            .and_then(<[String]>::first)
            .ok_or(AuthError::MissingCertificate)?;

        let cert_der = STANDARD.decode(encoded_cert).map_err(|e| {
            AuthError::CertificateParse(format!("failed to decode certificate: {e}"))
        })?;
        let (_, cert) = X509Certificate::from_der(&cert_der)
            .map_err(|e| AuthError::CertificateParse(e.to_string()))?;

        let public_key = rsa_public_key(&cert)?;

        if !is_rsa_algorithm(header.alg) {
            return Err(AuthError::SignatureInvalid(format!(
                "unexpected signing method: {:?}",
                header.alg
            )));
        }
        verify_signature(assertion, header.alg, &public_key)?;
        let claims = unverified;
        if claims.exp.is_some_and(|exp| now > exp) {
            return Err(AuthError::AssertionExpired);
        }

        if claims.iss != self.trusted_issuer {
            return Err(AuthError::IssuerMismatch {
                expected: self.trusted_issuer.clone(),
                actual: claims.iss,
            });
        }

        let validity = cert.validity();
        check_certificate_window(
            validity.not_before.timestamp(),
            validity.not_after.timestamp(),
            now,
        )?;

        Ok(ValidatedAssertion {
            subject: claims.sub.clone(),
            claims,
        })
    }
}

/// The certificate's RSA public key.
fn rsa_public_key(cert: &X509Certificate<'_>) -> Result<RsaPublicKey, AuthError> {
    let spki = cert.public_key();
    match spki.parsed() {
        // subject_public_key holds the PKCS#1 RSAPublicKey DER
        Ok(PublicKey::RSA(_)) => RsaPublicKey::from_pkcs1_der(&spki.subject_public_key.data)
            .map_err(|e| AuthError::CertificateParse(format!("invalid RSA public key: {e}"))),
        _ => Err(AuthError::UnsupportedKeyType),
    }
}

/// Verify the RSASSA-PKCS1-v1_5 signature over `header.payload`.
///
/// Client keys below 2048 bits are accepted here.
fn verify_signature(assertion: &str, alg: Algorithm, key: &RsaPublicKey) -> Result<(), AuthError> {
    let (signing_input, encoded_signature) = assertion
        .rsplit_once('.')
        .ok_or_else(|| AuthError::Parse("missing signature segment".to_string()))?;

    let signature_bytes = URL_SAFE_NO_PAD
        .decode(encoded_signature)
        .map_err(|e| AuthError::SignatureInvalid(format!("malformed signature: {e}")))?;
    let signature = Signature::try_from(signature_bytes.as_slice())
        .map_err(|e| AuthError::SignatureInvalid(e.to_string()))?;

    let message = signing_input.as_bytes();
    let key = key.clone();
    let verified = match alg {
        Algorithm::RS256 => VerifyingKey::<Sha256>::new(key).verify(message, &signature),
        Algorithm::RS384 => VerifyingKey::<Sha384>::new(key).verify(message, &signature),
        Algorithm::RS512 => VerifyingKey::<Sha512>::new(key).verify(message, &signature),
        other => {
            return Err(AuthError::SignatureInvalid(format!(
                "unexpected signing method: {other:?}"
            )))
        }
    };

    verified.map_err(|e| AuthError::SignatureInvalid(e.to_string()))
}

/// Reject `now` outside `[not_before, not_after]` (inclusive, Unix seconds).
pub(crate) fn check_certificate_window(
    not_before: i64,
    not_after: i64,
    now: i64,
) -> Result<(), AuthError> {
    if now > not_after {
        return Err(AuthError::CertificateExpired);
    }
    if now < not_before {
        return Err(AuthError::CertificateNotYetValid);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ts_test_utils::crypto_fixtures::{
        client_certificate_der, self_signed_cert_der, CertValidity, ATTACKER_KEY_PKCS1_PEM,
        ATTACKER_KEY_PKCS8_PEM, CLIENT_KEY_PKCS8_PEM, EC_KEY_PKCS8_PEM,
        LEGACY_CLIENT_CERT_1024_X5C, LEGACY_KEY_1024_PKCS1_PEM,
    };
    use ts_test_utils::test_ids::{TEST_ASSERTION_TYPE, TEST_CLIENT_A, TEST_ISSUER, TEST_OTHER_ISSUER};
    use ts_test_utils::token_builders::{tamper_signature, tamper_signature_byte, TestAssertionBuilder};

    fn validator() -> AssertionValidator {
        AssertionValidator::new(TEST_ISSUER)
    }

    fn validate(assertion: &str) -> Result<ValidatedAssertion, AuthError> {
        validator().validate(assertion, TEST_ASSERTION_TYPE)
    }

    #[test]
    fn test_valid_assertion_returns_subject_and_claims() {
        let assertion = TestAssertionBuilder::new().for_client(TEST_CLIENT_A).build();

        let validated = validate(&assertion).unwrap();

        assert_eq!(validated.subject, TEST_CLIENT_A);
        assert_eq!(validated.claims.iss, TEST_ISSUER);
        assert!(validated.claims.exp.is_some());
    }

    #[test]
    fn test_assertion_type_hint_does_not_change_outcome() {
        let assertion = TestAssertionBuilder::new().build();

        assert!(validator().validate(&assertion, "anything-at-all").is_ok());
    }

    #[test]
    fn test_assertion_without_expiry_is_accepted() {
        let assertion = TestAssertionBuilder::new().without_expiry().build();
        assert!(validate(&assertion).is_ok());
    }

    #[test]
    fn test_malformed_structure_is_parse_error() {
        for assertion in ["", "not-a-jwt", "a.b", "a.b.c.d"] {
            assert!(
                matches!(validate(assertion), Err(AuthError::Parse(_))),
                "{assertion:?} should be a parse error"
            );
        }
    }

    #[test]
    fn test_oversized_assertion_is_parse_error() {
        let assertion = format!("{}.e30.sig", "a".repeat(9000));
        assert!(matches!(validate(&assertion), Err(AuthError::Parse(_))));
    }

    #[test]
    fn test_missing_subject_is_parse_error() {
        let assertion = TestAssertionBuilder::new().without_subject().build();
        assert!(matches!(validate(&assertion), Err(AuthError::Parse(_))));
    }

    #[test]
    fn test_blank_subject_is_parse_error() {
        let assertion = TestAssertionBuilder::new().for_client("   ").build();
        assert!(matches!(validate(&assertion), Err(AuthError::Parse(_))));
    }

    #[test]
    fn test_missing_x5c_is_missing_certificate() {
        let assertion = TestAssertionBuilder::new().without_x5c().build();
        assert_eq!(validate(&assertion).unwrap_err(), AuthError::MissingCertificate);
    }

    #[test]
    fn test_empty_x5c_is_missing_certificate() {
        let assertion = TestAssertionBuilder::new().with_x5c(vec![]).build();
        assert_eq!(validate(&assertion).unwrap_err(), AuthError::MissingCertificate);
    }

    #[test]
    fn test_non_base64_certificate_is_certificate_parse_error() {
        let assertion = TestAssertionBuilder::new()
            .with_x5c(vec!["***not base64***".to_string()])
            .build();
        assert!(matches!(
            validate(&assertion),
            Err(AuthError::CertificateParse(_))
        ));
    }

    #[test]
    fn test_non_der_certificate_is_certificate_parse_error() {
        let assertion = TestAssertionBuilder::new()
            .with_certificate_der(b"definitely not a certificate")
            .build();
        assert!(matches!(
            validate(&assertion),
            Err(AuthError::CertificateParse(_))
        ));
    }

    #[test]
    fn test_ec_certificate_is_unsupported_key_type() {
        let ec_cert = self_signed_cert_der("ec-client", EC_KEY_PKCS8_PEM, CertValidity::Current)
            .unwrap();
        let assertion = TestAssertionBuilder::new()
            .with_certificate_der(&ec_cert)
            .build();

        assert_eq!(validate(&assertion).unwrap_err(), AuthError::UnsupportedKeyType);
    }

    #[test]
    fn test_signature_from_other_key_is_signature_invalid() {
        let assertion = TestAssertionBuilder::new()
            .signed_with(ATTACKER_KEY_PKCS1_PEM)
            .build();

        assert!(matches!(
            validate(&assertion),
            Err(AuthError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_tampered_signature_is_signature_invalid() {
        let assertion = tamper_signature(&TestAssertionBuilder::new().build());

        assert!(matches!(
            validate(&assertion),
            Err(AuthError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_signature_from_other_pkcs8_key_is_signature_invalid() {
        let assertion = TestAssertionBuilder::new()
            .signed_with(ATTACKER_KEY_PKCS8_PEM)
            .build();

        assert!(matches!(
            validate(&assertion),
            Err(AuthError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_any_flipped_signature_byte_is_signature_invalid() {
        let assertion = TestAssertionBuilder::new().build();

        // 2048-bit key: 256-byte signature
        for index in [0, 128, 255] {
            let tampered = tamper_signature_byte(&assertion, index);
            assert!(
                matches!(validate(&tampered), Err(AuthError::SignatureInvalid(_))),
                "byte {index} flipped should fail verification"
            );
        }
    }

    fn legacy_assertion() -> TestAssertionBuilder {
        TestAssertionBuilder::new()
            .for_client("legacy-client")
            .with_x5c(vec![LEGACY_CLIENT_CERT_1024_X5C.to_string()])
    }

    #[test]
    fn test_1024_bit_certificate_with_valid_signature_is_accepted() {
        let assertion = legacy_assertion()
            .signed_with(LEGACY_KEY_1024_PKCS1_PEM)
            .build();

        let validated = validate(&assertion).unwrap();
        assert_eq!(validated.subject, "legacy-client");
    }

    #[test]
    fn test_1024_bit_certificate_rejects_foreign_signature() {
        let assertion = legacy_assertion().build();

        assert!(matches!(
            validate(&assertion),
            Err(AuthError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_hmac_algorithm_is_rejected() {
        // Classic confusion: HMAC keyed with public material the verifier also holds
        let cert = client_certificate_der(TEST_CLIENT_A).unwrap();
        let assertion = TestAssertionBuilder::new()
            .with_certificate_der(&cert)
            .with_algorithm(Algorithm::HS256)
            .signed_with(&STANDARD.encode(&cert))
            .build();

        assert!(matches!(
            validate(&assertion),
            Err(AuthError::SignatureInvalid(_))
        ));
    }

    #[test]
    fn test_rs384_and_rs512_are_accepted() {
        for alg in [Algorithm::RS384, Algorithm::RS512] {
            let assertion = TestAssertionBuilder::new().with_algorithm(alg).build();
            assert!(validate(&assertion).is_ok(), "{alg:?} should be accepted");
        }
    }

    #[test]
    fn test_expired_assertion_is_assertion_expired() {
        let assertion = TestAssertionBuilder::new().expires_in(-60).build();
        assert_eq!(validate(&assertion).unwrap_err(), AuthError::AssertionExpired);
    }

    #[test]
    fn test_issuer_mismatch_names_expected_and_actual() {
        let assertion = TestAssertionBuilder::new().issued_by(TEST_ISSUER).build();

        let err = AssertionValidator::new(TEST_OTHER_ISSUER)
            .validate(&assertion, TEST_ASSERTION_TYPE)
            .unwrap_err();

        assert_eq!(
            err,
            AuthError::IssuerMismatch {
                expected: TEST_OTHER_ISSUER.to_string(),
                actual: TEST_ISSUER.to_string(),
            }
        );
    }

    #[test]
    fn test_missing_issuer_is_issuer_mismatch() {
        let assertion = TestAssertionBuilder::new().without_issuer().build();
        assert!(matches!(
            validate(&assertion),
            Err(AuthError::IssuerMismatch { .. })
        ));
    }

    #[test]
    fn test_expired_certificate_is_rejected() {
        let cert =
            self_signed_cert_der(TEST_CLIENT_A, CLIENT_KEY_PKCS8_PEM, CertValidity::Expired)
                .unwrap();
        let assertion = TestAssertionBuilder::new().with_certificate_der(&cert).build();

        assert_eq!(validate(&assertion).unwrap_err(), AuthError::CertificateExpired);
    }

    #[test]
    fn test_not_yet_valid_certificate_is_rejected() {
        let cert =
            self_signed_cert_der(TEST_CLIENT_A, CLIENT_KEY_PKCS8_PEM, CertValidity::NotYetValid)
                .unwrap();
        let assertion = TestAssertionBuilder::new().with_certificate_der(&cert).build();

        assert_eq!(
            validate(&assertion).unwrap_err(),
            AuthError::CertificateNotYetValid
        );
    }

    #[test]
    fn test_validate_at_uses_supplied_clock_for_certificate() {
        let assertion = TestAssertionBuilder::new().without_expiry().build();
        // 2100-01-01, past the fixture certificate's not_after
        let far_future = 4_102_444_800;

        assert_eq!(
            validator().validate_at(&assertion, far_future).unwrap_err(),
            AuthError::CertificateExpired
        );
    }

    #[test]
    fn test_certificate_window_boundaries_are_inclusive() {
        assert!(check_certificate_window(100, 200, 100).is_ok());
        assert!(check_certificate_window(100, 200, 200).is_ok());
        assert_eq!(
            check_certificate_window(100, 200, 201).unwrap_err(),
            AuthError::CertificateExpired
        );
        assert_eq!(
            check_certificate_window(100, 200, 99).unwrap_err(),
            AuthError::CertificateNotYetValid
        );
    }
}
