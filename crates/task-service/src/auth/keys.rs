//! Service RSA key material.
//!
//! The service signs and verifies its own access tokens with a single RSA
//! key pair loaded once at startup. PEM input may be PKCS#1
//! (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`).

use crate::auth::error::AuthError;
use jsonwebtoken::crypto::sign;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, PrivateKeyInfo};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt;
use x509_parser::pem::parse_x509_pem;

const KEY_CHECK_MESSAGE: &[u8] = b"task-service key check";

/// Encoding the private key was supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Pkcs1,
    Pkcs8,
}

/// RSA private key and its derived public key, immutable after construction.
pub struct ServiceKeyPair {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    key_bits: usize,
    encoding: KeyEncoding,
}

impl ServiceKeyPair {
    /// Parse a PEM-encoded RSA private key.
    ///
    /// PKCS#1 is attempted first, then PKCS#8. A PKCS#8 key for any other
    /// algorithm (for example EC) is a `KeyType` error.
    ///
    /// # Errors
    ///
    /// - `KeyFormat` - No PEM block, or the block is neither PKCS#1 nor PKCS#8
    /// - `KeyType` - PKCS#8 key is not RSA, or the RSA key size is one the
    ///   signer rejects (below 2048 bits)
    pub fn from_pem(pem: &[u8]) -> Result<Self, AuthError> {
        let (_, block) = parse_x509_pem(pem)
            .map_err(|e| AuthError::KeyFormat(format!("failed to decode PEM block: {e}")))?;

        let (private_key, encoding) = parse_private_key_der(&block.contents)?;

        let private_der = private_key
            .to_pkcs1_der()
            .map_err(|e| AuthError::KeyFormat(format!("failed to encode private key: {e}")))?;

        let public_key = RsaPublicKey::from(&private_key);
        let public_der = public_key
            .to_pkcs1_der()
            .map_err(|e| AuthError::KeyFormat(format!("failed to encode public key: {e}")))?;

        let key_bits = public_key.size() * 8;
        let encoding_key = EncodingKey::from_rsa_der(private_der.as_bytes());

        // Signing backend refuses moduli outside 2048..=4096 bits.
        sign(KEY_CHECK_MESSAGE, &encoding_key, Algorithm::RS256).map_err(|e| {
            AuthError::KeyType(format!("{key_bits}-bit RSA key cannot sign RS256: {e}"))
        })?;

        tracing::debug!(
            target: "ts.auth.keys",
            encoding = ?encoding,
            key_bits,
            "Loaded service signing key"
        );

        Ok(Self {
            encoding_key,
            decoding_key: DecodingKey::from_rsa_der(public_der.as_bytes()),
            key_bits,
            encoding,
        })
    }

    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

impl fmt::Debug for ServiceKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKeyPair")
            .field("encoding", &self.encoding)
            .field("key_bits", &self.key_bits)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

fn parse_private_key_der(der: &[u8]) -> Result<(RsaPrivateKey, KeyEncoding), AuthError> {
    if let Ok(key) = RsaPrivateKey::from_pkcs1_der(der) {
        return Ok((key, KeyEncoding::Pkcs1));
    }

    let info = PrivateKeyInfo::try_from(der).map_err(|e| {
        AuthError::KeyFormat(format!("key is neither PKCS#1 nor PKCS#8: {e}"))
    })?;

    if info.algorithm.oid != rsa::pkcs1::ALGORITHM_OID {
        return Err(AuthError::KeyType(format!(
            "PKCS#8 key algorithm {} is not rsaEncryption",
            info.algorithm.oid
        )));
    }

    let key = RsaPrivateKey::from_pkcs8_der(der)
        .map_err(|e| AuthError::KeyFormat(format!("invalid PKCS#8 RSA key: {e}")))?;

    Ok((key, KeyEncoding::Pkcs8))
}
