//! Health monitor
//!
//! Background task that keeps the registry honest: every probe period it
//! snapshots the pool, pings each worker, and immediately evicts any worker
//! whose probe fails or times out. Eviction is self-healing maintenance and
//! is never surfaced to in-flight estimate requests; a request that already
//! snapshotted the evicted worker will simply see its call fail.
//!
//! The registry lock is held only for the snapshot and for each individual
//! removal; probes themselves run outside any critical section.

use crate::master::registry::WorkerRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodic worker liveness checker
pub struct HealthMonitor {
    registry: Arc<WorkerRegistry>,
    period: Duration,
}

impl HealthMonitor {
    /// Create a monitor over `registry` probing every `period`
    pub fn new(registry: Arc<WorkerRegistry>, period: Duration) -> Self {
        Self { registry, period }
    }

    /// Spawn the monitor loop onto the runtime
    ///
    /// The task runs until the returned handle is aborted or the runtime
    /// shuts down.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.period);
            // A slow probe cycle should not cause a burst of catch-up ticks
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_cycle().await;
            }
        })
    }

    /// Probe every registered worker once, evicting the unresponsive
    async fn run_cycle(&self) {
        let snapshot = self.registry.snapshot();

        for (name, handle) in snapshot {
            if let Err(e) = handle.ping().await {
                // The worker may have been removed while we probed; only log
                // an eviction we actually performed.
                if self.registry.remove(&name) {
                    println!("Worker {} not responding, evicted ({})", name, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::mock::MockWorker;

    #[tokio::test]
    async fn test_failing_worker_evicted_within_one_period() {
        let registry = Arc::new(WorkerRegistry::new());
        let healthy = Arc::new(MockWorker::new());
        let dead = Arc::new(MockWorker::failing());

        registry.add("healthy", healthy.clone());
        registry.add("dead", dead.clone());

        let monitor = HealthMonitor::new(Arc::clone(&registry), Duration::from_millis(20));
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(registry.count(), 1);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].0, "healthy");
        // Both workers were actually probed
        assert!(healthy.ping_calls() >= 1);
        assert!(dead.ping_calls() >= 1);
    }

    #[tokio::test]
    async fn test_monitor_keeps_probing_after_eviction() {
        let registry = Arc::new(WorkerRegistry::new());
        let healthy = Arc::new(MockWorker::new());

        registry.add("dead", Arc::new(MockWorker::failing()));
        registry.add("healthy", healthy.clone());

        let monitor = HealthMonitor::new(Arc::clone(&registry), Duration::from_millis(10));
        let handle = monitor.spawn();

        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        // The survivor keeps being probed across cycles
        assert!(healthy.ping_calls() >= 3);
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn test_worker_recovering_before_probe_survives() {
        let registry = Arc::new(WorkerRegistry::new());
        let flaky = Arc::new(MockWorker::new());

        registry.add("flaky", flaky.clone());

        let monitor = HealthMonitor::new(Arc::clone(&registry), Duration::from_millis(10));
        let handle = monitor.spawn();

        // Never failed while probed, so it must still be registered
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(registry.count(), 1);
    }
}
