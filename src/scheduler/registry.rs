//! Task Registry Module
//!
//! Guarded collection of task descriptors with due-set computation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::scheduler::task::{Operation, TaskDescriptor, TaskId, TaskInfo};

// == Registry Entry ==
#[derive(Debug)]
struct Entry {
    task: Arc<TaskDescriptor>,
    /// Last successful completion; `None` when `now - interval` is not
    /// representable, which counts as due
    last_run: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run {
            Some(last_run) => now.signed_duration_since(last_run) >= to_delta(self.task.interval),
            None => true,
        }
    }
}

// == Task Registry ==
/// Registered maintenance tasks and their last successful run.
///
/// Due-set reads and `last_run` writes go through one lock. Operations never
/// run while it is held.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Appends a task that is due immediately (`last_run = now - interval`).
    ///
    /// Duplicate names are accepted; each registration runs independently.
    pub async fn register(
        &self,
        name: impl Into<String>,
        interval: Duration,
        operation: Operation,
    ) -> TaskId {
        self.register_at(name.into(), interval, operation, Utc::now()).await
    }

    pub(crate) async fn register_at(
        &self,
        name: String,
        interval: Duration,
        operation: Operation,
        now: DateTime<Utc>,
    ) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let last_run = now.checked_sub_signed(to_delta(interval));

        debug!(task = %name, id = %id, interval_secs = interval.as_secs(), "Registered maintenance task");

        let task = Arc::new(TaskDescriptor {
            id,
            name,
            interval,
            operation,
        });
        self.entries.write().await.push(Entry { task, last_run });
        id
    }

    // == Due Set ==
    /// Returns every task whose elapsed time since `last_run` is at least its interval.
    pub async fn due_set(&self, now: DateTime<Utc>) -> Vec<Arc<TaskDescriptor>> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|entry| entry.is_due(now))
            .map(|entry| entry.task.clone())
            .collect()
    }

    // == Mark Success ==
    /// Records a successful run for exactly one task, matched by id.
    ///
    /// `last_run` never moves backwards. Returns false if the id is unknown
    /// or `when` is not newer than the recorded run.
    pub async fn mark_success(&self, id: TaskId, when: DateTime<Utc>) -> bool {
        let mut entries = self.entries.write().await;
        match entries.iter_mut().find(|entry| entry.task.id == id) {
            Some(entry) if entry.last_run.map_or(true, |last_run| when > last_run) => {
                entry.last_run = Some(when);
                true
            }
            _ => false,
        }
    }

    /// Last successful run of a task.
    pub async fn last_run(&self, id: TaskId) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.task.id == id)
            .and_then(|entry| entry.last_run)
    }

    /// Every task in registration order.
    pub async fn all(&self) -> Vec<Arc<TaskDescriptor>> {
        self.entries
            .read()
            .await
            .iter()
            .map(|entry| entry.task.clone())
            .collect()
    }

    /// First task registered under `name`.
    pub async fn find_first(&self, name: &str) -> Option<Arc<TaskDescriptor>> {
        self.entries
            .read()
            .await
            .iter()
            .find(|entry| entry.task.name == name)
            .map(|entry| entry.task.clone())
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> Vec<TaskInfo> {
        self.entries
            .read()
            .await
            .iter()
            .map(|entry| TaskInfo {
                id: entry.task.id,
                name: entry.task.name.clone(),
                interval_secs: entry.task.interval.as_secs(),
                last_run: entry.last_run,
                due: entry.is_due(now),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn to_delta(interval: Duration) -> TimeDelta {
    TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX)
}
