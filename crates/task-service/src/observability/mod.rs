//! Observability module for the task service.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
