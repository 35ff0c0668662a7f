//! Task Descriptor Module
//!
//! Defines the operation contract, the per-task execution scope and the
//! immutable descriptor stored in the registry.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// == Operation ==
/// Future returned by a maintenance operation.
pub type OperationFuture = BoxFuture<'static, anyhow::Result<()>>;

/// A schedulable maintenance operation.
///
/// Receives a cancellable, deadline-bearing [`TaskScope`] and returns `Ok(())`
/// on success. The scheduler treats it as opaque.
pub type Operation = Arc<dyn Fn(TaskScope) -> OperationFuture + Send + Sync>;

/// Wraps an async closure into an [`Operation`].
///
/// # Example
/// ```ignore
/// let op = operation(|scope: TaskScope| async move {
///     if scope.is_cancelled() {
///         anyhow::bail!("cancelled");
///     }
///     Ok(())
/// });
/// ```
pub fn operation<F, Fut>(f: F) -> Operation
where
    F: Fn(TaskScope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |scope| f(scope).boxed())
}

// == Task Scope ==
/// Execution scope handed to an operation: a child cancellation token plus a deadline.
#[derive(Clone, Debug)]
pub struct TaskScope {
    task: Arc<str>,
    token: CancellationToken,
    deadline: Instant,
}

impl TaskScope {
    pub fn new(task: impl Into<Arc<str>>, token: CancellationToken, deadline: Instant) -> Self {
        Self {
            task: task.into(),
            token,
            deadline,
        }
    }

    /// Name of the task running under this scope.
    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// True once the scope was cancelled or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || Instant::now() >= self.deadline
    }

    /// Completes when the scope is cancelled or the deadline passes.
    pub async fn cancelled(&self) {
        tokio::select! {
            _ = self.token.cancelled() => {}
            _ = tokio::time::sleep_until(self.deadline) => {}
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

// == Task Id ==
/// Registry-assigned identity. Names may repeat, ids never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// == Task Descriptor ==
/// A registered task. Immutable after registration; `last_run` lives in the registry.
pub struct TaskDescriptor {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) interval: Duration,
    pub(crate) operation: Operation,
}

impl TaskDescriptor {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl fmt::Debug for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

// == Task Info ==
/// Point-in-time view of a registered task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub interval_secs: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub due: bool,
}
