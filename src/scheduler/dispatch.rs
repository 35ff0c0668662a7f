//! Dispatch Loop
//!
//! Fixed-period clock that hands due tasks to the executor on every tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::BatchError;
use crate::scheduler::executor::Executor;
use crate::scheduler::registry::TaskRegistry;

// == Dispatch Loop ==
#[derive(Clone)]
pub(crate) struct DispatchLoop {
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) executor: Arc<Executor>,
    pub(crate) tick: Duration,
    /// Scope batches run under. Not tied to the loop's stop token.
    pub(crate) batch_scope: CancellationToken,
    pub(crate) ticks: Arc<AtomicU64>,
}

impl DispatchLoop {
    /// Ticks until `stop` is cancelled.
    ///
    /// The first tick fires one period after start. Missed ticks burst rather
    /// than being skipped, and a batch still running when the next tick fires
    /// overlaps with the new one.
    pub(crate) async fn run(self, stop: CancellationToken) {
        let mut clock = interval_at(Instant::now() + self.tick, self.tick);
        info!(tick_secs = self.tick.as_secs(), "Maintenance dispatch loop started");

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = clock.tick() => self.on_tick().await,
            }
        }

        info!("Maintenance dispatch loop stopped");
    }

    async fn on_tick(&self) {
        self.ticks.fetch_add(1, Ordering::SeqCst);

        let due = self.registry.due_set(Utc::now()).await;
        if due.is_empty() {
            trace!("No maintenance tasks due");
            return;
        }
        debug!(count = due.len(), "Dispatching due maintenance tasks");

        let executor = self.executor.clone();
        let scope = self.batch_scope.clone();
        tokio::spawn(async move {
            let report = executor.run_batch(due, &scope).await;
            if !report.is_success() {
                let err = BatchError {
                    failures: report.failures,
                };
                error!(error = %err, "Periodic maintenance batch failed");
            }
        });
    }
}
