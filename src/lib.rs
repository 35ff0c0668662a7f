//! Maintenance Scheduler - periodic and on-demand background maintenance
//!
//! Runs registered maintenance operations on a fixed dispatch clock with
//! bounded concurrency, per-task timeouts and fault isolation, under a
//! self-healing supervisor.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod tasks;

pub use api::AppState;
pub use config::{Config, SchedulerConfig};
pub use error::{SchedulerError, TaskError};
pub use scheduler::{MaintenanceScheduler, TaskScope};
