//! Utilities shared between the task service and its test tooling.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, unverified header and claims decoding)
pub mod jwt;
