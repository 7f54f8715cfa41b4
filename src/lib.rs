//! pipulse - Distributed Monte Carlo pi estimation
//!
//! pipulse coordinates a variable-size pool of worker agents that sample random
//! points in the unit square and count how many land inside the inscribed
//! circle. The master fans each request out across the current pool, sums the
//! partial counts, and reports `4 * inside / total` as the estimate.
//!
//! # Architecture
//!
//! - **Master**: worker registry, health monitoring, work distribution, result
//!   aggregation, and test-mode statistics tiering
//! - **Worker**: lightweight agent answering liveness probes and sampling batches
//! - **Client**: interactive front end for issuing estimate requests
//! - **Protocol**: length-prefixed MessagePack messages over TCP

pub mod client;
pub mod config;
pub mod master;
pub mod protocol;
pub mod worker;

// Re-export commonly used types
pub use client::MasterClient;
pub use master::MasterService;
pub use worker::WorkerService;

/// Result type used throughout pipulse
pub type Result<T> = anyhow::Result<T>;
