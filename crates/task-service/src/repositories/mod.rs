//! Repository layer for the task service.
//!
//! Provides database access following the Handler -> Service -> Repository
//! architecture.

pub mod tasks;

pub use tasks::TasksRepository;
