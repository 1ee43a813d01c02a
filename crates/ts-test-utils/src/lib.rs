//! # Task Service Test Utilities
//!
//! Shared test utilities for the task service.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed RSA keys, self-signed certificates)
//! - Test data builders (`TestAssertionBuilder`, `TestAccessTokenBuilder`)
//! - Server test harness (`TestTaskServer` for E2E tests)
//! - Fixed test IDs and issuers
//! - Custom assertions (`TokenAssertions` trait)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ts_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestTaskServer::spawn().await?;
//!
//!     let assertion = TestAssertionBuilder::new()
//!         .for_client("client-A")
//!         .issued_by(TEST_ISSUER)
//!         .build();
//!
//!     let token = server.exchange_assertion(&assertion).await?;
//!     token.assert_valid_jwt().assert_for_subject("client-A");
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod crypto_fixtures;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

// Re-export commonly used items
pub use assertions::*;
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
