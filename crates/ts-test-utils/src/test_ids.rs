//! Fixed test IDs for deterministic tests
//!
//! Using fixed identifiers prevents flaky tests caused by random data.

use uuid::Uuid;

// Issuers
pub const TEST_ISSUER: &str = "issuer-X";
pub const TEST_OTHER_ISSUER: &str = "issuer-Y";

// Client identities (assertion `sub`)
pub const TEST_CLIENT_A: &str = "client-A";
pub const TEST_CLIENT_B: &str = "client-B";

// Assertion type sent by well-behaved clients
pub const TEST_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

// Task IDs that are never inserted
pub const TEST_MISSING_TASK_ID: Uuid = Uuid::from_u128(404);

// Access-token lifetime used by the test server
pub const TEST_TOKEN_LIFETIME_SECS: u64 = 3600;
