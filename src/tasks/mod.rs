//! Built-in Maintenance Tasks
//!
//! Concrete operations registered by the service binary.
//!
//! # Tasks
//! - Temp cleanup: Removes stale files from the configured temp directory

mod temp_cleanup;

pub use temp_cleanup::{cleanup_stale_files, TEMP_CLEANUP_TASK};

use crate::config::Config;
use crate::scheduler::{MaintenanceScheduler, TaskId};

/// Registers every built-in task at the configured maintenance interval.
pub async fn register_builtin_tasks(
    scheduler: &MaintenanceScheduler,
    config: &Config,
) -> Vec<TaskId> {
    let interval = config.scheduler.maintenance_interval;
    let temp = config.temp_cleanup.clone();

    let temp_id = scheduler
        .register(TEMP_CLEANUP_TASK, interval, move |scope| {
            let temp = temp.clone();
            async move {
                cleanup_stale_files(&temp.dir, temp.max_age, &scope)
                    .await
                    .map(|_| ())
            }
        })
        .await;

    vec![temp_id]
}
