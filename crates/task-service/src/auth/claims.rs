//! Typed claim sets for client assertions and access tokens.
//!
//! The `sub` field identifies a client and is redacted in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audience of a client assertion: a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// Claims carried by a client assertion.
///
/// A missing `iss` deserializes as empty and later fails the issuer check.
#[derive(Clone, Serialize, Deserialize)]
pub struct AssertionClaims {
    #[serde(default)]
    pub iss: String,

    /// Client identity - redacted in Debug output.
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl fmt::Debug for AssertionClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssertionClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("jti", &self.jti)
            .finish()
    }
}

/// Claims of an access token issued by this service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub iss: String,

    /// Client identity - redacted in Debug output.
    pub sub: String,

    /// Always `{iss}/api`.
    pub aud: String,

    pub iat: i64,

    pub exp: i64,

    /// Issuance time in nanoseconds since the epoch.
    pub jti: String,
}

impl fmt::Debug for AccessClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .finish()
    }
}
