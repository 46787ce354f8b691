//! Background idle-session sweeper.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::EvictionPolicy;
use crate::registry::SessionRegistry;
use crate::session::unix_now;

/// Owned handle to a running sweeper task.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "session sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Spawn a task that sweeps `registry` every `interval` until `shutdown`
/// is cancelled.
pub fn spawn_sweeper(
    registry: Arc<SessionRegistry>,
    policy: EvictionPolicy,
    interval: Duration,
    shutdown: CancellationToken,
) -> SweeperHandle {
    let shutdown = shutdown.child_token();
    let cancel = shutdown.clone();
    let period = interval.max(Duration::from_millis(1));

    let join = tokio::spawn(async move {
        if policy.is_disabled() {
            tracing::info!("idle session eviction disabled");
            shutdown.cancelled().await;
            return;
        }

        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = registry.sweep(&policy, unix_now());
                    if removed > 0 {
                        tracing::info!(removed, remaining = registry.len(), "swept idle sessions");
                    }
                }
            }
        }

        tracing::debug!("session sweeper stopped");
    });

    SweeperHandle { cancel, join }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sweeper_evicts_then_stops_on_cancel() {
        let registry = Arc::new(SessionRegistry::new());
        registry.resolve("10.0.0.1:1").set_last_activity(0);
        registry.resolve("10.0.0.1:2").authenticate(42);

        let handle = spawn_sweeper(
            registry.clone(),
            EvictionPolicy::new(60),
            Duration::from_millis(10),
            CancellationToken::new(),
        );

        for _ in 0..100 {
            if registry.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.len(), 1);
        assert!(registry.get("10.0.0.1:2").is_some());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn parent_token_stops_the_sweeper() {
        let token = CancellationToken::new();
        let handle = spawn_sweeper(
            Arc::new(SessionRegistry::new()),
            EvictionPolicy::new(0),
            Duration::from_secs(60),
            token.clone(),
        );

        token.cancel();
        for _ in 0..100 {
            if handle.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(handle.is_finished());
    }
}
