//! Bounded Concurrent Executor
//!
//! Runs batches of maintenance tasks with a shared parallelism bound, a
//! per-task deadline and per-task panic isolation.
//!
//! ```text
//!   batch ──► acquire permit ──► spawn(op(scope)) ──► join | deadline
//!                                    │                     │
//!                              catch_unwind          cancel scope,
//!                                                    detach the work
//! ```
//! The deadline is fixed at submission, so time spent queued for a slot
//! counts against it. The permit travels with the spawned work, so an
//! operation that ignores cancellation keeps its slot until it returns on
//! its own.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{BatchError, SchedulerError, TaskError};
use crate::scheduler::registry::TaskRegistry;
use crate::scheduler::task::{TaskDescriptor, TaskScope};

// == Batch Report ==
/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Names of tasks that completed without error
    pub succeeded: Vec<String>,
    /// Every task error, panic and timeout
    pub failures: Vec<TaskError>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts into the aggregate error when any task failed.
    pub fn into_result(self) -> Result<Vec<String>, SchedulerError> {
        if self.failures.is_empty() {
            Ok(self.succeeded)
        } else {
            Err(BatchError {
                failures: self.failures,
            }
            .into())
        }
    }
}

// == Executor ==
#[derive(Debug)]
pub struct Executor {
    registry: Arc<TaskRegistry>,
    permits: Arc<Semaphore>,
    task_timeout: Duration,
}

impl Executor {
    pub fn new(
        registry: Arc<TaskRegistry>,
        max_concurrent_tasks: usize,
        task_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            permits: Arc::new(Semaphore::new(
                max_concurrent_tasks.clamp(1, Semaphore::MAX_PERMITS),
            )),
            task_timeout,
        }
    }

    // == Run Batch ==
    /// Runs every task with bounded parallelism and waits for all outcomes.
    ///
    /// Successful tasks get their `last_run` advanced. Failures never stop
    /// sibling tasks.
    pub async fn run_batch(
        &self,
        tasks: Vec<Arc<TaskDescriptor>>,
        parent: &CancellationToken,
    ) -> BatchReport {
        let mut handles = Vec::with_capacity(tasks.len());
        let timeout = self.task_timeout;
        let deadline = Instant::now() + timeout;

        for task in tasks {
            let permits = self.permits.clone();
            let registry = self.registry.clone();
            let parent = parent.clone();
            let name = task.name.clone();

            let handle = tokio::spawn(async move {
                let acquired = tokio::select! {
                    biased;
                    acquired = permits.acquire_owned() => acquired,
                    _ = tokio::time::sleep_until(deadline) => {
                        warn!(task = %task.name, "Maintenance task timed out waiting for a slot");
                        return Err(TaskError::TimedOut {
                            task: task.name.clone(),
                            timeout,
                        });
                    }
                };
                let permit = match acquired {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Err(TaskError::Failed {
                            task: task.name.clone(),
                            source: anyhow::anyhow!("executor slots closed"),
                        })
                    }
                };
                let outcome = run_guarded(&task, &parent, timeout, deadline, Some(permit)).await;
                if outcome.is_ok() {
                    registry.mark_success(task.id, Utc::now()).await;
                }
                outcome
            });
            handles.push((name, handle));
        }

        let mut report = BatchReport::default();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(())) => report.succeeded.push(name),
                Ok(Err(err)) => report.failures.push(err),
                Err(join_err) => report.failures.push(TaskError::Panicked {
                    task: name,
                    message: join_err.to_string(),
                }),
            }
        }

        debug!(
            succeeded = report.succeeded.len(),
            failed = report.failures.len(),
            "Maintenance batch finished"
        );
        report
    }

    // == Run Single ==
    /// Runs one task in the caller's flow, outside the parallelism bound.
    pub async fn run_single(
        &self,
        task: &Arc<TaskDescriptor>,
        parent: &CancellationToken,
    ) -> Result<(), TaskError> {
        let deadline = Instant::now() + self.task_timeout;
        run_guarded(task, parent, self.task_timeout, deadline, None).await?;
        self.registry.mark_success(task.id, Utc::now()).await;
        Ok(())
    }

    /// Number of free parallelism slots.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }
}

// == Guarded Invocation ==
/// Invokes one operation behind the fault isolation boundary.
///
/// On expiry of `deadline` the scope is cancelled and the task is reported as
/// timed out; the work itself keeps running.
async fn run_guarded(
    task: &TaskDescriptor,
    parent: &CancellationToken,
    timeout: Duration,
    deadline: Instant,
    permit: Option<OwnedSemaphorePermit>,
) -> Result<(), TaskError> {
    let token = parent.child_token();
    let started = Instant::now();
    let scope = TaskScope::new(task.name.as_str(), token.clone(), deadline);
    let op = task.operation.clone();

    // The call sits inside the async block so a panic while building the
    // future is trapped as well.
    let work = AssertUnwindSafe(async move { op(scope).await }).catch_unwind();
    let mut handle = tokio::spawn(async move {
        let outcome = work.await;
        drop(permit);
        outcome
    });

    let result = tokio::select! {
        biased;
        joined = &mut handle => match joined {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(source))) => Err(TaskError::Failed {
                task: task.name.clone(),
                source,
            }),
            Ok(Err(payload)) => Err(TaskError::Panicked {
                task: task.name.clone(),
                message: panic_message(payload.as_ref()),
            }),
            Err(join_err) => Err(TaskError::Panicked {
                task: task.name.clone(),
                message: join_err.to_string(),
            }),
        },
        _ = tokio::time::sleep_until(deadline) => {
            token.cancel();
            let name = task.name.clone();
            tokio::spawn(async move {
                if handle.await.is_ok() {
                    debug!(task = %name, "Timed-out task returned after its deadline");
                }
            });
            Err(TaskError::TimedOut {
                task: task.name.clone(),
                timeout,
            })
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(()) => info!(task = %task.name, elapsed_ms, "Maintenance task completed"),
        Err(err @ TaskError::Panicked { .. }) => {
            error!(task = %task.name, elapsed_ms, error = %err, "Maintenance task panicked")
        }
        Err(err) => warn!(task = %task.name, elapsed_ms, error = %err, "Maintenance task failed"),
    }
    result
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
