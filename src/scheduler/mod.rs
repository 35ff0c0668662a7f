//! Scheduler Module
//!
//! Periodic and on-demand execution of registered maintenance tasks with
//! bounded concurrency, per-task fault isolation and a self-healing
//! dispatch loop.

mod dispatch;
mod executor;
mod registry;
mod service;
mod supervisor;
mod task;


// Re-export public types
pub use executor::{BatchReport, Executor};
pub use registry::TaskRegistry;
pub use service::MaintenanceScheduler;
pub use supervisor::RestartPolicy;
pub use task::{operation, Operation, OperationFuture, TaskDescriptor, TaskId, TaskInfo, TaskScope};
