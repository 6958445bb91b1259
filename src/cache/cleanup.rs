//! Background expiry sweep
//!
//! Periodically purges expired entries so that keys which are never read
//! again do not hold memory until eviction.

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A store whose expired entries can be purged in one pass
pub trait ExpirySweeper: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Remove every expired entry, returning how many were removed
    fn purge_expired(&self) -> u64;
}

/// Handle to a running sweep task; the sweep stops when the handle is dropped
#[derive(Debug)]
pub struct SweeperHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweep and wait for the task to finish
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Spawn a sweep over `target` every `interval`.
///
/// Returns None for a zero interval or outside a Tokio runtime. The task holds only a weak reference
/// and exits once the target is dropped.
pub fn spawn_sweeper<S: ExpirySweeper>(target: &Arc<S>, interval: Duration) -> Option<SweeperHandle> {
    if interval == Duration::ZERO {
        return None;
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(backend = target.name(), "No async runtime, expiry sweep not started");
        return None;
    };

    let weak: Weak<S> = Arc::downgrade(target);
    let token = CancellationToken::new();
    let child = token.clone();
    let name = target.name();

    let task = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = child.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(target) = weak.upgrade() else { break };
                    let purged = target.purge_expired();
                    if purged > 0 {
                        debug!(backend = name, purged = purged, "Swept expired cache entries");
                    }
                }
            }
        }

        debug!(backend = name, "Expiry sweep stopped");
    });

    info!(backend = name, interval_secs = interval.as_secs(), "Started expiry sweep");

    Some(SweeperHandle {
        token,
        task: Some(task),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct Counter {
        sweeps: AtomicU64,
    }

    impl ExpirySweeper for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn purge_expired(&self) -> u64 {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            1
        }
    }

    #[test]
    fn test_zero_interval_not_started() {
        let target = Arc::new(Counter {
            sweeps: AtomicU64::new(0),
        });
        assert!(spawn_sweeper(&target, Duration::ZERO).is_none());
    }

    #[test]
    fn test_no_runtime_not_started() {
        let target = Arc::new(Counter {
            sweeps: AtomicU64::new(0),
        });
        assert!(spawn_sweeper(&target, Duration::from_millis(10)).is_none());
    }

    #[tokio::test]
    async fn test_sweep_runs_and_stops() {
        let target = Arc::new(Counter {
            sweeps: AtomicU64::new(0),
        });
        let handle = spawn_sweeper(&target, Duration::from_millis(10)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(target.sweeps.load(Ordering::SeqCst) >= 1);
        assert!(handle.is_running());

        handle.stop().await;
        let after_stop = target.sweeps.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(target.sweeps.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_sweep_exits_when_target_dropped() {
        let target = Arc::new(Counter {
            sweeps: AtomicU64::new(0),
        });
        let handle = spawn_sweeper(&target, Duration::from_millis(10)).unwrap();
        drop(target);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_running());
    }
}
