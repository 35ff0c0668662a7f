//! Self-Healing Supervisor
//!
//! Owns the dispatch loop's lifecycle: a loop that panics is logged and
//! relaunched after a backoff, until the stop token fires or the restart
//! budget runs out.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::SchedulerConfig;
use crate::scheduler::executor::panic_message;

// == Restart Policy ==
/// Delay schedule for relaunching a faulted loop.
///
/// The delay for consecutive fault `n` is `first × factor^n`, capped at `max`.
#[derive(Clone, Copy, Debug)]
pub struct RestartPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
    /// `None` relaunches forever
    pub max_restarts: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
            max_restarts: None,
        }
    }
}

impl RestartPolicy {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            first: config.restart_backoff,
            max_restarts: config.max_restarts,
            ..Self::default()
        }
    }

    /// Delay before relaunch after `attempt` consecutive faults (0-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);
        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

// == Supervise ==
/// Runs `launch()` until it returns normally, relaunching it after panics.
///
/// A run that stayed healthy for longer than `policy.max` resets the backoff.
pub(crate) async fn supervise<F, Fut>(
    policy: RestartPolicy,
    stop: CancellationToken,
    restarts: Arc<AtomicU32>,
    mut launch: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut attempt: u32 = 0;
    let mut relaunched: u32 = 0;

    loop {
        let started = Instant::now();
        let message = match AssertUnwindSafe(launch()).catch_unwind().await {
            Ok(()) => {
                debug!("Dispatch loop exited");
                return;
            }
            Err(payload) => panic_message(payload.as_ref()),
        };

        error!(error = %message, "Dispatch loop faulted");

        if stop.is_cancelled() {
            return;
        }
        if let Some(max) = policy.max_restarts {
            if relaunched >= max {
                error!(restarts = relaunched, "Dispatch loop restart budget exhausted, giving up");
                return;
            }
        }
        if started.elapsed() > policy.max {
            attempt = 0;
        }

        let delay = policy.delay(attempt);
        attempt = attempt.saturating_add(1);
        relaunched += 1;
        warn!(delay_ms = delay.as_millis() as u64, attempt, "Relaunching dispatch loop");

        tokio::select! {
            _ = stop.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        restarts.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RestartPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(1),
            factor: 2.0,
            max_restarts: None,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(10), Duration::from_secs(1));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_relaunches_after_panic() {
        let launches = Arc::new(AtomicUsize::new(0));
        let restarts = Arc::new(AtomicU32::new(0));
        let stop = CancellationToken::new();

        let counter = launches.clone();
        let loop_stop = stop.clone();
        let handle = tokio::spawn(supervise(
            RestartPolicy::default(),
            stop.clone(),
            restarts.clone(),
            move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let loop_stop = loop_stop.clone();
                async move {
                    if n < 2 {
                        panic!("tick handler fault {n}");
                    }
                    loop_stop.cancelled().await;
                }
            },
        ));

        // backoff is 1s then 2s
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(launches.load(Ordering::SeqCst), 3);
        assert_eq!(restarts.load(Ordering::SeqCst), 2);
        assert!(!handle.is_finished());

        stop.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let launches = Arc::new(AtomicUsize::new(0));
        let restarts = Arc::new(AtomicU32::new(0));
        let policy = RestartPolicy {
            max_restarts: Some(2),
            ..RestartPolicy::default()
        };

        let counter = launches.clone();
        supervise(policy, CancellationToken::new(), restarts.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { panic!("deterministic fault") }
        })
        .await;

        assert_eq!(launches.load(Ordering::SeqCst), 3);
        assert_eq!(restarts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_backoff_ends_supervision() {
        let launches = Arc::new(AtomicUsize::new(0));
        let stop = CancellationToken::new();
        let policy = RestartPolicy {
            first: Duration::from_secs(30),
            ..RestartPolicy::default()
        };

        let counter = launches.clone();
        let handle = tokio::spawn(supervise(
            policy,
            stop.clone(),
            Arc::new(AtomicU32::new(0)),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { panic!("always") }
            },
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        stop.cancel();
        handle.await.unwrap();
        assert_eq!(launches.load(Ordering::SeqCst), 1);
    }
}
