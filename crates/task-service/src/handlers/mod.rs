//! HTTP request handlers for the task service.

pub mod health;
pub mod me;
pub mod metrics;
pub mod tasks;
pub mod token;

pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
pub use tasks::{create_task, delete_task, get_task, list_tasks, update_task};
pub use token::issue_token;
