//! Task management module.
//!
//! Every accepted upload becomes a task identified by a UUID. Tasks are validated off the
//! request path and their state is kept in memory for clients to poll.

/// Submodule running the validation of one upload.
pub mod processor;
/// Submodule for task state and result types.
pub mod task;
/// Submodule for the task registry.
pub mod task_manager;

pub use task::{TaskResult, TaskState};
pub use task_manager::TaskManager;
