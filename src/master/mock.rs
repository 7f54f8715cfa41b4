//! Mock worker for testing
//!
//! This module provides an in-process implementation of the `WorkerClient`
//! trait so the registry, monitor, distributor, and aggregator can be tested
//! without sockets. The mock can be configured to return a fixed in-circle
//! count, derive the count from the requested share, fail, or delay, and it
//! tracks every call for verification.
//!
//! # Example
//!
//! ```
//! use pipulse::master::mock::MockWorker;
//! use pipulse::master::WorkerClient;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let worker = MockWorker::returning(42);
//! assert_eq!(worker.count_points(100).await.unwrap(), 42);
//! assert_eq!(worker.sample_calls(), 1);
//! assert_eq!(worker.last_requested(), Some(100));
//! # });
//! ```

use crate::master::remote::WorkerClient;
use crate::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Configurable in-process worker
///
/// By default the mock answers every probe and counts a fixed fraction of
/// the requested points as inside the circle (roughly pi/4, so aggregate
/// estimates look plausible in tests that don't pin exact counts).
pub struct MockWorker {
    /// Fixed in-circle count returned for every sampling call, if set
    fixed_count: Option<u64>,

    /// Whether probes and sampling calls should fail
    should_fail: AtomicBool,

    /// Optional artificial latency applied to every call
    delay: Option<Duration>,

    /// Number of ping calls received
    ping_calls: AtomicUsize,

    /// Number of sampling calls received
    sample_calls: AtomicUsize,

    /// Points requested by the most recent sampling call
    last_requested: Mutex<Option<u64>>,

    /// Sum of points requested across all sampling calls
    total_requested: AtomicU64,
}

impl MockWorker {
    /// Create a mock that derives counts from the requested share
    pub fn new() -> Self {
        Self {
            fixed_count: None,
            should_fail: AtomicBool::new(false),
            delay: None,
            ping_calls: AtomicUsize::new(0),
            sample_calls: AtomicUsize::new(0),
            last_requested: Mutex::new(None),
            total_requested: AtomicU64::new(0),
        }
    }

    /// Create a mock that returns a fixed in-circle count for every call
    pub fn returning(fixed_count: u64) -> Self {
        Self {
            fixed_count: Some(fixed_count),
            ..Self::new()
        }
    }

    /// Create a mock whose probes and sampling calls always fail
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.should_fail.store(true, Ordering::SeqCst);
        mock
    }

    /// Create a mock that sleeps before answering each call
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    /// Toggle failure behavior at runtime
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Number of ping calls received so far
    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    /// Number of sampling calls received so far
    pub fn sample_calls(&self) -> usize {
        self.sample_calls.load(Ordering::SeqCst)
    }

    /// Points requested by the most recent sampling call
    pub fn last_requested(&self) -> Option<u64> {
        *self.last_requested.lock().unwrap()
    }

    /// Sum of points requested across all sampling calls
    pub fn total_requested(&self) -> u64 {
        self.total_requested.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for MockWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkerClient for MockWorker {
    async fn ping(&self) -> Result<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;

        if self.should_fail.load(Ordering::SeqCst) {
            anyhow::bail!("Mock worker configured to fail");
        }

        Ok(())
    }

    async fn count_points(&self, num_points: u64) -> Result<u64> {
        self.sample_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_requested.lock().unwrap() = Some(num_points);
        self.total_requested.fetch_add(num_points, Ordering::SeqCst);
        self.apply_delay().await;

        if self.should_fail.load(Ordering::SeqCst) {
            anyhow::bail!("Mock worker configured to fail");
        }

        match self.fixed_count {
            Some(count) => Ok(count),
            // Deterministic stand-in for real sampling: floor(n * pi/4)
            None => Ok((num_points as f64 * std::f64::consts::FRAC_PI_4) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_count() {
        let worker = MockWorker::returning(785_398);
        assert_eq!(worker.count_points(1_000_000).await.unwrap(), 785_398);
        assert_eq!(worker.last_requested(), Some(1_000_000));
    }

    #[tokio::test]
    async fn test_failure_toggle() {
        let worker = MockWorker::new();
        assert!(worker.ping().await.is_ok());

        worker.set_should_fail(true);
        assert!(worker.ping().await.is_err());
        assert!(worker.count_points(10).await.is_err());

        worker.set_should_fail(false);
        assert!(worker.ping().await.is_ok());
        assert_eq!(worker.ping_calls(), 3);
    }

    #[tokio::test]
    async fn test_call_tracking() {
        let worker = MockWorker::new();
        worker.count_points(100).await.unwrap();
        worker.count_points(250).await.unwrap();

        assert_eq!(worker.sample_calls(), 2);
        assert_eq!(worker.last_requested(), Some(250));
        assert_eq!(worker.total_requested(), 350);
    }
}
