//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tokio::sync::Semaphore;

/// Tick period of the dispatch loop. Distinct from any task's own interval.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;

// == Scheduler Config ==
/// Scheduler configuration, immutable for the lifetime of a scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Disables the whole subsystem when false (`start` becomes a no-op)
    pub enabled: bool,
    /// Suggested interval for the built-in maintenance tasks
    pub maintenance_interval: Duration,
    /// Period of the dispatch loop clock
    pub tick_interval: Duration,
    /// Maximum number of task operations executing at once
    pub max_concurrent_tasks: usize,
    /// Deadline handed to every task operation
    pub task_timeout: Duration,
    /// Delay before the first relaunch of a faulted dispatch loop
    pub restart_backoff: Duration,
    /// Upper bound on loop relaunches, `None` means unbounded
    pub max_restarts: Option<u32>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            maintenance_interval: Duration::from_secs(3600),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            max_concurrent_tasks: 3,
            task_timeout: Duration::from_secs(30 * 60),
            restart_backoff: Duration::from_secs(1),
            max_restarts: None,
        }
    }
}

impl SchedulerConfig {
    /// Loads scheduler settings from environment variables.
    ///
    /// # Environment Variables
    /// - `MAINTENANCE_ENABLED` - Enable the scheduler (default: true)
    /// - `MAINTENANCE_INTERVAL` - Built-in task interval in seconds (default: 3600)
    /// - `MAINTENANCE_TICK_INTERVAL` - Dispatch tick in seconds, at least 1 (default: 60)
    /// - `MAINTENANCE_MAX_CONCURRENT_TASKS` - Parallelism bound, clamped to the
    ///   semaphore's permit limit (default: 3)
    /// - `MAINTENANCE_TASK_TIMEOUT` - Per-task timeout in seconds (default: 1800)
    /// - `MAINTENANCE_RESTART_BACKOFF` - First loop restart delay in seconds (default: 1)
    /// - `MAINTENANCE_MAX_RESTARTS` - Loop restart cap (default: unbounded)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("MAINTENANCE_ENABLED", defaults.enabled),
            maintenance_interval: env_secs("MAINTENANCE_INTERVAL", defaults.maintenance_interval),
            tick_interval: env_secs("MAINTENANCE_TICK_INTERVAL", defaults.tick_interval)
                .max(Duration::from_secs(1)),
            max_concurrent_tasks: env_or(
                "MAINTENANCE_MAX_CONCURRENT_TASKS",
                defaults.max_concurrent_tasks,
            )
            .clamp(1, Semaphore::MAX_PERMITS),
            task_timeout: env_secs("MAINTENANCE_TASK_TIMEOUT", defaults.task_timeout),
            restart_backoff: env_secs("MAINTENANCE_RESTART_BACKOFF", defaults.restart_backoff),
            max_restarts: env::var("MAINTENANCE_MAX_RESTARTS")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

// == Temp Cleanup Config ==
/// Thresholds for the built-in temp-file cleanup operation.
#[derive(Debug, Clone)]
pub struct TempCleanupConfig {
    /// Directory whose stale files are removed
    pub dir: PathBuf,
    /// Files older than this are removed
    pub max_age: Duration,
}

impl Default for TempCleanupConfig {
    fn default() -> Self {
        Self {
            dir: env::temp_dir(),
            max_age: Duration::from_secs(24 * 3600),
        }
    }
}

// == Service Config ==
/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port of the administrative endpoint
    pub server_port: u16,
    /// Scheduler settings
    pub scheduler: SchedulerConfig,
    /// Temp-file cleanup thresholds
    pub temp_cleanup: TempCleanupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            scheduler: SchedulerConfig::default(),
            temp_cleanup: TempCleanupConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `TEMP_DIR` - Directory cleaned by the temp-file task (default: system temp dir)
    /// - `TEMP_FILE_MAX_AGE` - Max temp file age in seconds (default: 86400)
    /// - plus everything read by [`SchedulerConfig::from_env`]
    pub fn from_env() -> Self {
        let temp_defaults = TempCleanupConfig::default();
        Self {
            server_port: env_or("SERVER_PORT", 3000),
            scheduler: SchedulerConfig::from_env(),
            temp_cleanup: TempCleanupConfig {
                dir: env::var("TEMP_DIR")
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or(temp_defaults.dir),
                max_age: env_secs("TEMP_FILE_MAX_AGE", temp_defaults.max_age),
            },
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.maintenance_interval, Duration::from_secs(3600));
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.max_concurrent_tasks, 3);
        assert_eq!(config.task_timeout, Duration::from_secs(1800));
        assert!(config.max_restarts.is_none());
    }

    #[test]
    fn test_config_from_env() {
        // Single test touches the environment to avoid races between tests
        env::remove_var("SERVER_PORT");
        env::remove_var("MAINTENANCE_ENABLED");
        env::remove_var("MAINTENANCE_MAX_RESTARTS");
        env::set_var("MAINTENANCE_MAX_CONCURRENT_TASKS", "0");
        env::set_var("MAINTENANCE_TASK_TIMEOUT", "not-a-number");
        env::set_var("TEMP_FILE_MAX_AGE", "120");

        let config = Config::from_env();
        assert_eq!(config.server_port, 3000);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.max_concurrent_tasks, 1);
        assert_eq!(config.scheduler.task_timeout, Duration::from_secs(1800));
        assert!(config.scheduler.max_restarts.is_none());
        assert_eq!(config.temp_cleanup.max_age, Duration::from_secs(120));

        env::set_var("MAINTENANCE_ENABLED", "false");
        env::set_var("MAINTENANCE_MAX_RESTARTS", "5");
        env::set_var("MAINTENANCE_MAX_CONCURRENT_TASKS", usize::MAX.to_string());
        env::set_var("MAINTENANCE_TICK_INTERVAL", "0");
        let config = SchedulerConfig::from_env();
        assert!(!config.enabled);
        assert_eq!(config.max_restarts, Some(5));
        assert_eq!(config.max_concurrent_tasks, Semaphore::MAX_PERMITS);
        assert_eq!(config.tick_interval, Duration::from_secs(1));

        env::remove_var("MAINTENANCE_ENABLED");
        env::remove_var("MAINTENANCE_MAX_RESTARTS");
        env::remove_var("MAINTENANCE_MAX_CONCURRENT_TASKS");
        env::remove_var("MAINTENANCE_TASK_TIMEOUT");
        env::remove_var("MAINTENANCE_TICK_INTERVAL");
        env::remove_var("TEMP_FILE_MAX_AGE");
    }
}
