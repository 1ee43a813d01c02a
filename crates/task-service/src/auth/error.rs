//! Error types for the auth core.
//!
//! Every failure mode has its own variant so callers (and tests) can match on
//! the kind of failure instead of the message text.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Key input holds no PEM block, or the block is neither PKCS#1 nor PKCS#8.
    #[error("invalid private key: {0}")]
    KeyFormat(String),

    /// PKCS#8 key decoded, but it is not an RSA key.
    #[error("private key is not an RSA key: {0}")]
    KeyType(String),

    #[error("failed to parse assertion: {0}")]
    Parse(String),

    #[error("x5c header is missing or empty")]
    MissingCertificate,

    #[error("failed to parse certificate: {0}")]
    CertificateParse(String),

    #[error("certificate public key is not RSA")]
    UnsupportedKeyType,

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("assertion has expired")]
    AssertionExpired,

    #[error("invalid issuer: expected {expected}, got {actual}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("certificate has expired")]
    CertificateExpired,

    #[error("certificate is not yet valid")]
    CertificateNotYetValid,

    #[error("failed to sign access token: {0}")]
    Signing(String),

    #[error("unexpected signing method: {0}")]
    AlgorithmMismatch(String),

    #[error("token has expired")]
    TokenExpired,

    #[error("{0}")]
    TokenInvalid(String),

    #[error("Authorization header required")]
    MissingAuth,

    #[error("Invalid authorization header format. Expected 'Bearer <token>'")]
    MalformedAuthHeader,
}

impl AuthError {
    /// Bounded label for the `error_type` metric dimension.
    pub fn metric_label(&self) -> &'static str {
        match self {
            AuthError::KeyFormat(_) => "key_format",
            AuthError::KeyType(_) => "key_type",
            AuthError::Parse(_) => "parse",
            AuthError::MissingCertificate => "missing_certificate",
            AuthError::CertificateParse(_) => "certificate_parse",
            AuthError::UnsupportedKeyType => "unsupported_key_type",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::AssertionExpired => "assertion_expired",
            AuthError::IssuerMismatch { .. } => "issuer_mismatch",
            AuthError::CertificateExpired => "certificate_expired",
            AuthError::CertificateNotYetValid => "certificate_not_yet_valid",
            AuthError::Signing(_) => "signing",
            AuthError::AlgorithmMismatch(_) => "algorithm_mismatch",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenInvalid(_) => "token_invalid",
            AuthError::MissingAuth => "missing_auth",
            AuthError::MalformedAuthHeader => "malformed_auth_header",
        }
    }
}
