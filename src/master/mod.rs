//! Master implementation
//!
//! The master coordinates the worker pool and serves estimate requests.
//!
//! # Architecture
//!
//! - **registry**: thread-safe pool membership (single source of truth)
//! - **monitor**: periodic liveness probing with silent eviction
//! - **distributor**: even fan-out of a request over a registry snapshot
//! - **aggregator**: all-or-nothing fan-in of the partial counts
//! - **stats**: test-mode duration/error tiering with a persistent log
//! - **service**: TCP front end tying the pieces together
//! - **remote**/**mock**: the worker-client abstraction and its two
//!   implementations (TCP, in-process test double)

pub mod aggregator;
pub mod distributor;
pub mod mock;
pub mod monitor;
pub mod registry;
pub mod remote;
pub mod service;
pub mod stats;

// Re-export key types
pub use aggregator::AggregationError;
pub use distributor::NoWorkersAvailable;
pub use monitor::HealthMonitor;
pub use registry::WorkerRegistry;
pub use remote::{RemoteWorker, WorkerClient};
pub use service::{MasterService, MasterState};
pub use stats::StatsCollector;
