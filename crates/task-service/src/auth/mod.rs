//! Authentication core.
//!
//! Components, leaf-first:
//!
//! - [`keys::ServiceKeyPair`] - service RSA key loaded from PEM
//! - [`assertion::AssertionValidator`] - trusts client assertions via their `x5c` certificate
//! - [`tokens::TokenIssuer`] - mints RS256 access tokens
//! - [`tokens::TokenVerifier`] - verifies access tokens on protected routes
//! - [`client_assertion::sign_client_assertion`] - client-side counterpart
//!   that signs assertions for manual testing
//!
//! None of these hold mutable state or perform I/O; they are shared behind
//! `Arc` and used concurrently without locking.

pub mod assertion;
pub mod claims;
pub mod client_assertion;
pub mod error;
pub mod keys;
pub mod tokens;

pub use assertion::{AssertionValidator, ValidatedAssertion};
pub use claims::{AccessClaims, AssertionClaims, Audience};
pub use client_assertion::{sign_client_assertion, AssertionRequest};
pub use error::AuthError;
pub use keys::{KeyEncoding, ServiceKeyPair};
pub use tokens::{TokenIssuer, TokenVerifier};
