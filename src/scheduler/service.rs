//! Administrative API
//!
//! The entry points other subsystems call: register, start, stop, restart,
//! run-all and run-one.

use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::scheduler::dispatch::DispatchLoop;
use crate::scheduler::executor::Executor;
use crate::scheduler::registry::TaskRegistry;
use crate::scheduler::supervisor::{supervise, RestartPolicy};
use crate::scheduler::task::{operation, TaskId, TaskInfo, TaskScope};

/// One armed dispatch loop and the supervisor that owns it.
struct RunningLoop {
    stop: CancellationToken,
    supervisor: JoinHandle<()>,
}

struct Inner {
    config: SchedulerConfig,
    registry: Arc<TaskRegistry>,
    executor: Arc<Executor>,
    loops: Mutex<Vec<RunningLoop>>,
    ticks: Arc<AtomicU64>,
    restarts: Arc<AtomicU32>,
}

// == Maintenance Scheduler ==
/// Periodic and on-demand runner for registered maintenance tasks.
///
/// Cheap to clone; clones share the registry and running loops.
#[derive(Clone)]
pub struct MaintenanceScheduler {
    inner: Arc<Inner>,
}

impl MaintenanceScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let registry = Arc::new(TaskRegistry::new());
        let executor = Arc::new(Executor::new(
            registry.clone(),
            config.max_concurrent_tasks,
            config.task_timeout,
        ));
        Self {
            inner: Arc::new(Inner {
                config,
                registry,
                executor,
                loops: Mutex::new(Vec::new()),
                ticks: Arc::new(AtomicU64::new(0)),
                restarts: Arc::new(AtomicU32::new(0)),
            }),
        }
    }

    // == Register ==
    /// Registers a task; it is due immediately.
    pub async fn register<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        op: F,
    ) -> TaskId
    where
        F: Fn(TaskScope) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.inner
            .registry
            .register(name, interval, operation(op))
            .await
    }

    // == Start ==
    /// Arms a supervised dispatch loop under `scope`.
    ///
    /// A no-op when disabled. Not idempotent: every call arms another loop.
    pub fn start(&self, scope: &CancellationToken) {
        if !self.inner.config.enabled {
            debug!("Maintenance scheduler disabled, not starting");
            return;
        }

        let stop = scope.child_token();
        let dispatch = DispatchLoop {
            registry: self.inner.registry.clone(),
            executor: self.inner.executor.clone(),
            tick: self.inner.config.tick_interval,
            batch_scope: scope.clone(),
            ticks: self.inner.ticks.clone(),
        };
        let policy = RestartPolicy::from_config(&self.inner.config);
        let loop_stop = stop.clone();
        let supervisor = tokio::spawn(supervise(
            policy,
            stop.clone(),
            self.inner.restarts.clone(),
            move || dispatch.clone().run(loop_stop.clone()),
        ));

        let mut loops = self.inner.loops.lock().unwrap_or_else(PoisonError::into_inner);
        loops.retain(|running| !running.supervisor.is_finished());
        if !loops.is_empty() {
            warn!(running = loops.len(), "Maintenance scheduler started again while running");
        }
        loops.push(RunningLoop { stop, supervisor });
        info!(
            max_concurrent_tasks = self.inner.config.max_concurrent_tasks,
            task_timeout_secs = self.inner.config.task_timeout.as_secs(),
            "Maintenance scheduler started"
        );
    }

    // == Stop ==
    /// Stops every armed loop and waits until each has fully exited.
    ///
    /// Batches already submitted keep running.
    pub async fn stop(&self) {
        let loops = self.take_loops();
        if loops.is_empty() {
            return;
        }

        for running in &loops {
            running.stop.cancel();
        }
        for running in loops {
            if let Err(err) = running.supervisor.await {
                error!(error = %err, "Maintenance supervisor ended abnormally");
            }
        }
        info!("Maintenance scheduler stopped");
    }

    fn take_loops(&self) -> Vec<RunningLoop> {
        let mut loops = self.inner.loops.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *loops)
    }

    // == Restart ==
    pub async fn restart(&self, scope: &CancellationToken) {
        self.stop().await;
        self.start(scope);
    }

    // == Run All ==
    /// Runs every registered task now, regardless of due-ness.
    ///
    /// Returns the names of the tasks that succeeded, or an aggregate error
    /// naming each failed task.
    pub async fn run_all(&self, scope: &CancellationToken) -> Result<Vec<String>> {
        let tasks = self.inner.registry.all().await;
        info!(count = tasks.len(), "Running all maintenance tasks");
        self.inner.executor.run_batch(tasks, scope).await.into_result()
    }

    // == Run One ==
    /// Runs the first task registered under `name`, outside the parallelism bound.
    pub async fn run_one(&self, scope: &CancellationToken, name: &str) -> Result<()> {
        let task = self
            .inner
            .registry
            .find_first(name)
            .await
            .ok_or_else(|| SchedulerError::TaskNotFound(name.to_string()))?;

        info!(task = %name, "Running maintenance task on demand");
        self.inner.executor.run_single(&task, scope).await?;
        Ok(())
    }

    // == Introspection ==
    pub async fn tasks(&self) -> Vec<TaskInfo> {
        self.inner.registry.snapshot(Utc::now()).await
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.inner.registry
    }

    pub fn is_running(&self) -> bool {
        let loops = self.inner.loops.lock().unwrap_or_else(PoisonError::into_inner);
        loops.iter().any(|running| !running.supervisor.is_finished())
    }

    /// Ticks observed across every loop since construction.
    pub fn tick_count(&self) -> u64 {
        self.inner.ticks.load(Ordering::SeqCst)
    }

    /// Relaunches performed by the supervisor after loop faults.
    pub fn restart_count(&self) -> u32 {
        self.inner.restarts.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }
}
