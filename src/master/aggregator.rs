//! Result aggregation
//!
//! Fans an issued batch back in: waits for every pending call, then either
//! returns the summed in-circle count or declares the whole batch failed.
//! Failure is all-or-nothing: a single failed or timed-out worker call
//! voids the entire request, with no partial credit for the calls that
//! succeeded. The failure carries the first offending worker's name and
//! cause for the master's log.

use crate::master::distributor::PendingBatch;
use thiserror::Error;

/// A sampling call failed, voiding the whole batch
#[derive(Debug, Error)]
#[error("worker {worker} call failed: {source}")]
pub struct AggregationError {
    /// Name of the first worker whose call failed
    pub worker: String,

    #[source]
    pub source: anyhow::Error,
}

/// Wait for every call in `batch` and sum the partial counts
///
/// Every call is awaited even after a failure is observed, so no task is
/// left detached mid-request. If any call failed, the first failure is
/// returned and the partial sum is discarded.
pub async fn aggregate(batch: PendingBatch) -> Result<u64, AggregationError> {
    let mut total: u64 = 0;
    let mut failure: Option<AggregationError> = None;

    for call in batch.calls {
        let outcome = match call.handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("sampling task aborted: {}", e)),
        };

        match outcome {
            Ok(count) => total += count,
            Err(source) => {
                if failure.is_none() {
                    failure = Some(AggregationError {
                        worker: call.worker,
                        source,
                    });
                }
            }
        }
    }

    match failure {
        Some(error) => Err(error),
        None => Ok(total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::master::distributor::distribute;
    use crate::master::mock::MockWorker;
    use crate::master::remote::WorkerClient;
    use std::sync::Arc;

    fn pool(workers: Vec<Arc<MockWorker>>) -> Vec<(String, Arc<dyn WorkerClient>)> {
        workers
            .into_iter()
            .enumerate()
            .map(|(i, w)| (format!("worker{}", i + 1), w as Arc<dyn WorkerClient>))
            .collect()
    }

    #[tokio::test]
    async fn test_sums_partial_counts() {
        let workers = vec![
            Arc::new(MockWorker::returning(100)),
            Arc::new(MockWorker::returning(200)),
            Arc::new(MockWorker::returning(300)),
        ];

        let batch = distribute(pool(workers), 3_000).unwrap();
        assert_eq!(aggregate(batch).await.unwrap(), 600);
    }

    #[tokio::test]
    async fn test_single_failure_voids_batch() {
        let healthy: Vec<_> = (0..3).map(|_| Arc::new(MockWorker::returning(1_000))).collect();
        let mut workers = pool(healthy.clone());
        workers.push(("broken".to_string(), Arc::new(MockWorker::failing()) as Arc<dyn WorkerClient>));

        let batch = distribute(workers, 4_000).unwrap();
        let error = aggregate(batch).await.unwrap_err();

        // No partial credit, and the failure names the offender
        assert_eq!(error.worker, "broken");
        // The healthy workers were still asked for their share
        for worker in &healthy {
            assert_eq!(worker.sample_calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_waits_for_slow_workers() {
        use std::time::Duration;

        let workers = vec![
            Arc::new(MockWorker::returning(5)),
            Arc::new(MockWorker::with_delay(Duration::from_millis(80))),
        ];

        let batch = distribute(pool(workers), 200).unwrap();
        // share = 100; the delayed mock derives floor(100 * pi/4) = 78
        assert_eq!(aggregate(batch).await.unwrap(), 83);
    }

    #[tokio::test]
    async fn test_all_failures_report_first() {
        let workers: Vec<_> = (0..2).map(|_| Arc::new(MockWorker::failing())).collect();

        let batch = distribute(pool(workers), 100).unwrap();
        assert!(aggregate(batch).await.is_err());
    }
}
