//! Business logic layer for the task service.

pub mod task_service;
