//! Work distribution
//!
//! Splits an estimate request evenly over a registry snapshot and issues one
//! concurrent sampling call per worker. The worker set for a request is fixed
//! the moment the snapshot is taken; membership churn afterwards does not
//! affect calls already in flight.
//!
//! The per-worker share is `total_points / workers` with truncating division.
//! The remainder is dropped from the sampled total on purpose: the estimate
//! is still computed against the full requested count, preserving the
//! original system's arithmetic.

use crate::master::remote::WorkerClient;
use crate::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// Estimate requested against an empty pool
#[derive(Debug, Error)]
#[error("no workers available")]
pub struct NoWorkersAvailable;

/// One issued sampling call, tagged with the worker name for diagnostics
pub struct PendingCall {
    pub worker: String,
    pub handle: JoinHandle<Result<u64>>,
}

/// A fanned-out estimate request awaiting aggregation
pub struct PendingBatch {
    /// Per-worker share actually requested
    pub share: u64,

    /// One call per worker in the snapshot
    pub calls: Vec<PendingCall>,
}

/// Fan an estimate request out over `snapshot`
///
/// Issues one spawned sampling call per worker, each for the truncated
/// per-worker share. Returns `NoWorkersAvailable` without issuing any call
/// when the snapshot is empty.
pub fn distribute(
    snapshot: Vec<(String, Arc<dyn WorkerClient>)>,
    total_points: u64,
) -> std::result::Result<PendingBatch, NoWorkersAvailable> {
    if snapshot.is_empty() {
        return Err(NoWorkersAvailable);
    }

    let share = total_points / snapshot.len() as u64;

    let calls = snapshot
        .into_iter()
        .map(|(worker, handle)| {
            println!("Requesting {} points from worker {}...", share, worker);
            let task = tokio::spawn(async move { handle.count_points(share).await });
            PendingCall {
                worker,
                handle: task,
            }
        })
        .collect();

    Ok(PendingBatch { share, calls })
}
